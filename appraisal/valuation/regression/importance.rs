use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::normalizer::TrainingStatistics;

/// Relative influence of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name.
    pub feature: String,
    /// `|coefficient * feature_std / target_std|`.
    pub importance: f64,
    /// Raw model coefficient.
    pub coefficient: f64,
}

/// Standardized coefficients ordered by importance, most important first.
/// Ties keep feature order.
#[must_use]
pub fn rank(
    coefficients: &IndexMap<String, f64>,
    stats: &TrainingStatistics,
) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = coefficients
        .iter()
        .map(|(feature, coefficient)| {
            let feature_std = stats.feature(feature).map_or(1.0, |column| column.std);
            FeatureImportance {
                feature: feature.clone(),
                importance: (coefficient * feature_std / stats.target.std).abs(),
                coefficient: *coefficient,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::normalizer::SummaryStats;

    #[test]
    fn orders_by_standardized_magnitude_and_keeps_ties_stable() {
        let stats = TrainingStatistics {
            features: [
                ("bedrooms", SummaryStats { mean: 3.0, std: 1.0 }),
                ("squareFeet", SummaryStats { mean: 2000.0, std: 500.0 }),
                ("yearBuilt", SummaryStats { mean: 1990.0, std: 2.0 }),
                ("lotSize", SummaryStats { mean: 8000.0, std: 1.0 }),
            ]
            .into_iter()
            .map(|(name, column)| (name.to_owned(), column))
            .collect(),
            target: SummaryStats { mean: 300_000.0, std: 2.0 },
        };
        let coefficients: IndexMap<String, f64> = [
            ("bedrooms", 1.0),
            ("squareFeet", 0.01),
            ("yearBuilt", -1.0),
            ("lotSize", -2.0),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();

        let ranked = rank(&coefficients, &stats);
        let order: Vec<&str> = ranked.iter().map(|entry| entry.feature.as_str()).collect();
        // squareFeet 2.5; yearBuilt and lotSize tie at 1.0; bedrooms 0.5.
        assert_eq!(order, ["squareFeet", "yearBuilt", "lotSize", "bedrooms"]);
        assert!((ranked[1].coefficient + 1.0).abs() < f64::EPSILON);
        assert!(ranked.iter().all(|entry| entry.importance >= 0.0));
    }
}
