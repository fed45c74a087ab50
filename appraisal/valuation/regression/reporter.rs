use serde::{Deserialize, Serialize};

use super::evaluator::EvaluationResult;
use crate::{error::ValuationError, records::FeatureSet};

/// In-sample fit quality recorded right after training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Squared Pearson correlation on the training records.
    pub r2: f64,
    /// Root mean squared error on the training records.
    pub rmse: f64,
    /// `max(0, 1 - MAPE / 100)` on the training records.
    pub accuracy: f64,
    /// Records with a usable target.
    pub samples: usize,
}

impl From<&EvaluationResult> for TrainingMetrics {
    fn from(evaluation: &EvaluationResult) -> Self {
        Self {
            r2: evaluation.r2,
            rmse: evaluation.rmse,
            accuracy: evaluation.accuracy,
            samples: evaluation.samples(),
        }
    }
}

/// Outcome of `train`. Failures are reported here rather than as an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Whether the engine now holds a trained model.
    pub trained: bool,
    /// Features requested, in order.
    pub features: FeatureSet,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fit quality on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingMetrics>,
    /// Typed failure, for callers that branch on the cause.
    #[serde(skip)]
    pub failure: Option<ValuationError>,
}

impl TrainingResult {
    /// Successful run.
    #[must_use]
    pub const fn success(features: FeatureSet, metrics: TrainingMetrics) -> Self {
        Self {
            trained: true,
            features,
            error: None,
            metrics: Some(metrics),
            failure: None,
        }
    }

    /// Rejected or failed run.
    #[must_use]
    pub fn failure(features: FeatureSet, err: ValuationError) -> Self {
        Self {
            trained: false,
            features,
            error: Some(err.to_string()),
            metrics: None,
            failure: Some(err),
        }
    }

    /// One-line summary for logs and the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        match (&self.metrics, &self.error) {
            (Some(metrics), _) => format!(
                "[valuation] trained features={} samples={} r2={:.4} rmse={:.2} accuracy={:.4}",
                self.features.join(","),
                metrics.samples,
                metrics.r2,
                metrics.rmse,
                metrics.accuracy
            ),
            (None, Some(error)) => format!(
                "[valuation] untrained features={} error={error}",
                self.features.join(",")
            ),
            (None, None) => format!("[valuation] untrained features={}", self.features.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_message_only() {
        let result = TrainingResult::failure(
            FeatureSet::new(&["bedrooms"]),
            ValuationError::InsufficientCoverage {
                attribute: "bedrooms".into(),
                ratio: 0.2,
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["trained"], false);
        assert_eq!(json["features"][0], "bedrooms");
        assert_eq!(json["error"], "selected features have too many missing values");
        assert!(json.get("failure").is_none());
        assert!(json.get("metrics").is_none());
        assert!(result.summary().contains("untrained"));
    }

    #[test]
    fn success_summary_lists_metrics() {
        let result = TrainingResult::success(
            FeatureSet::new(&["squareFeet", "bedrooms"]),
            TrainingMetrics {
                r2: 0.9,
                rmse: 1234.5,
                accuracy: 0.95,
                samples: 12,
            },
        );
        assert_eq!(
            result.summary(),
            "[valuation] trained features=squareFeet,bedrooms samples=12 r2=0.9000 rmse=1234.50 accuracy=0.9500"
        );
    }
}
