use serde::{Deserialize, Serialize};

use super::{model::TrainedModel, normalizer::feature_input};
use crate::{currency::ValueFormatter, records::PropertyRecord};

/// Estimated value of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Estimated value, never negative.
    pub value: f64,
    /// `value` rendered as currency.
    pub formatted_value: String,
    /// Share of the trained features present on the record, scaled by the
    /// missing-feature penalty; in `[0, 1]`.
    pub confidence: f64,
    /// Set when features were missing and training means stood in for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Trained features absent from the record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_features: Vec<String>,
}

/// Denormalized, non-negative estimate for `record`.
#[must_use]
pub fn estimate(model: &TrainedModel, record: &PropertyRecord) -> f64 {
    let stats = model.stats();
    let raw = model
        .coefficients()
        .iter()
        .fold(model.intercept(), |acc, (feature, coefficient)| {
            let input = feature_input(record, feature, stats);
            let z = stats
                .feature(feature)
                .map_or(input, |column| column.z_score(input));
            coefficient.mul_add(z, acc)
        });
    // f64::max returns the other operand for NaN, so garbage clamps to zero too.
    model.target_stats().denormalize(raw).max(0.0)
}

/// Confidence for a record missing `missing` of `total` features.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn confidence(missing: usize, total: usize, penalty: f64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let missing_ratio = missing as f64 / total as f64;
    (1.0 - missing_ratio * penalty).clamp(0.0, 1.0)
}

/// Applies the model to one record. Malformed records degrade confidence,
/// they never fail.
#[must_use]
pub fn predict(
    model: &TrainedModel,
    record: &PropertyRecord,
    missing_penalty: f64,
    formatter: &dyn ValueFormatter,
) -> PredictionResult {
    let missing_features: Vec<String> = model
        .features()
        .iter()
        .filter(|feature| !record.is_present(feature))
        .cloned()
        .collect();
    let total = model.features().len();
    let value = estimate(model, record);
    let warning = (!missing_features.is_empty()).then(|| {
        format!(
            "{} of {} features missing ({}); training averages were used in their place",
            missing_features.len(),
            total,
            missing_features.join(", ")
        )
    });
    PredictionResult {
        value,
        formatted_value: formatter.format(value),
        confidence: confidence(missing_features.len(), total, missing_penalty),
        warning,
        missing_features,
    }
}
