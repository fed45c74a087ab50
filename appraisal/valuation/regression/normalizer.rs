use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::{FeatureSet, PropertyRecord};

/// Mean and sample standard deviation of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation; never zero.
    pub std: f64,
}

impl SummaryStats {
    /// Summarises `values`. An empty slice has mean 0; a degenerate spread
    /// (fewer than two values, all equal, or non-finite) is replaced by 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 1.0 };
        }
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let std = if values.len() < 2 {
            0.0
        } else {
            let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
            (squares / (count - 1.0)).sqrt()
        };
        let std = if std.is_finite() && std > 0.0 { std } else { 1.0 };
        Self { mean, std }
    }

    /// `(value - mean) / std`.
    #[must_use]
    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    /// Inverse of [`SummaryStats::z_score`].
    #[must_use]
    pub fn denormalize(&self, z: f64) -> f64 {
        z.mul_add(self.std, self.mean)
    }
}

/// Column statistics captured at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatistics {
    /// Per-feature statistics, in feature order.
    pub features: IndexMap<String, SummaryStats>,
    /// Target statistics.
    pub target: SummaryStats,
}

impl TrainingStatistics {
    /// Computes statistics over present, numeric, strictly positive values,
    /// and over usable targets.
    #[must_use]
    pub fn compute(features: &FeatureSet, records: &[PropertyRecord]) -> Self {
        let features = features
            .iter()
            .map(|feature| {
                let values: Vec<f64> = records
                    .iter()
                    .filter_map(|record| record.numeric(feature))
                    .filter(|value| *value > 0.0)
                    .collect();
                (feature.clone(), SummaryStats::from_values(&values))
            })
            .collect();
        let targets: Vec<f64> = records
            .iter()
            .filter_map(PropertyRecord::usable_target)
            .collect();
        Self {
            features,
            target: SummaryStats::from_values(&targets),
        }
    }

    /// Statistics for one feature.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&SummaryStats> {
        self.features.get(name)
    }
}

/// Raw model input for one feature: the numeric value when present, 0 for a
/// present but non-numeric value, the training mean when missing.
#[must_use]
pub fn feature_input(record: &PropertyRecord, feature: &str, stats: &TrainingStatistics) -> f64 {
    if record.is_present(feature) {
        record.numeric(feature).unwrap_or(0.0)
    } else {
        stats.feature(feature).map_or(0.0, |column| column.mean)
    }
}

/// Z-scored design matrix and target vector.
#[derive(Debug, Clone)]
pub struct NormalizedDesign {
    /// One row per record with a usable target, one column per feature.
    pub x: Array2<f64>,
    /// Normalized targets.
    pub y: Array1<f64>,
}

/// Builds the normalized design, skipping records without a usable target.
pub fn normalize(
    features: &FeatureSet,
    records: &[PropertyRecord],
    stats: &TrainingStatistics,
) -> Result<NormalizedDesign, NormalizationError> {
    let rows: Vec<(&PropertyRecord, f64)> = records
        .iter()
        .filter_map(|record| record.usable_target().map(|target| (record, target)))
        .collect();
    if rows.is_empty() {
        return Err(NormalizationError::NoUsableTargets);
    }

    let mut x = Array2::<f64>::zeros((rows.len(), features.len()));
    let mut y = Array1::<f64>::zeros(rows.len());
    for (row, (record, target)) in rows.iter().enumerate() {
        for (col, feature) in features.iter().enumerate() {
            let column = stats
                .feature(feature)
                .ok_or_else(|| NormalizationError::MissingStatistics(feature.clone()))?;
            x[[row, col]] = column.z_score(feature_input(record, feature, stats));
        }
        y[row] = stats.target.z_score(*target);
    }
    Ok(NormalizedDesign { x, y })
}

/// Failures while building the normalized design.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// Every target was missing, zero, or unparsable.
    #[error("no records with a positive target value")]
    NoUsableTargets,
    /// Statistics were computed for a different feature set.
    #[error("no training statistics for feature `{0}`")]
    MissingStatistics(String),
}
