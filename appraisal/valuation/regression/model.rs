use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use super::{
    importance::{self, FeatureImportance},
    normalizer::{SummaryStats, TrainingStatistics},
    solver::OlsSolution,
};
use crate::records::FeatureSet;

/// Immutable result of a successful training run.
///
/// Coefficient keys always equal the feature set, in the same order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainedModel {
    id: Uuid,
    trained_at: DateTime<Utc>,
    features: FeatureSet,
    coefficients: IndexMap<String, f64>,
    intercept: f64,
    stats: TrainingStatistics,
    importance: Vec<FeatureImportance>,
}

impl TrainedModel {
    /// Assembles the model and ranks its features.
    #[must_use]
    pub fn new(features: FeatureSet, solution: OlsSolution, stats: TrainingStatistics) -> Self {
        let coefficients: IndexMap<String, f64> = features
            .iter()
            .cloned()
            .zip(solution.coefficients)
            .collect();
        let importance = importance::rank(&coefficients, &stats);
        Self {
            id: Uuid::new_v4(),
            trained_at: Utc::now(),
            features,
            coefficients,
            intercept: solution.intercept,
            stats,
            importance,
        }
    }

    /// Identifier of this training run.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Completion time of training.
    #[must_use]
    pub const fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Features in training order.
    #[must_use]
    pub const fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Coefficients in the normalized space, keyed by feature.
    #[must_use]
    pub const fn coefficients(&self) -> &IndexMap<String, f64> {
        &self.coefficients
    }

    /// Coefficient of one feature.
    #[must_use]
    pub fn coefficient(&self, feature: &str) -> Option<f64> {
        self.coefficients.get(feature).copied()
    }

    /// Intercept in the normalized space.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Statistics captured during training.
    #[must_use]
    pub const fn stats(&self) -> &TrainingStatistics {
        &self.stats
    }

    /// Target statistics.
    #[must_use]
    pub const fn target_stats(&self) -> SummaryStats {
        self.stats.target
    }

    /// Features ranked by importance.
    #[must_use]
    pub fn importance(&self) -> &[FeatureImportance] {
        &self.importance
    }
}
