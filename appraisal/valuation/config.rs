use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyConfig;

/// Tunables for training, prediction, and display.
///
/// Every field has a default, so an empty TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Fewest records accepted by `train`.
    pub min_training_records: usize,
    /// Minimum fraction of records in which every feature and the target must
    /// be present.
    pub min_feature_coverage: f64,
    /// Confidence lost when every feature is missing; scaled by the missing
    /// fraction.
    pub missing_feature_penalty: f64,
    /// Pivots smaller than this abort matrix inversion.
    pub singular_pivot_epsilon: f64,
    /// Formatting of predicted values.
    pub currency: CurrencyConfig,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            min_training_records: 10,
            min_feature_coverage: 0.5,
            missing_feature_penalty: 0.5,
            singular_pivot_epsilon: 1e-10,
            currency: CurrencyConfig::default(),
        }
    }
}

impl ValuationConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading valuation config {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_training_records >= 1,
            "min_training_records must be at least 1"
        );
        ensure!(
            (0.0..=1.0).contains(&self.min_feature_coverage),
            "min_feature_coverage must lie in [0, 1]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.missing_feature_penalty),
            "missing_feature_penalty must lie in [0, 1]"
        );
        ensure!(
            self.singular_pivot_epsilon.is_finite() && self.singular_pivot_epsilon > 0.0,
            "singular_pivot_epsilon must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valuation.toml");
        fs::write(&path, "").unwrap();
        assert_eq!(ValuationConfig::load(&path).unwrap(), ValuationConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valuation.toml");
        fs::write(
            &path,
            "min_training_records = 25\n[currency]\nsymbol = \"CAD \"\n",
        )
        .unwrap();
        let config = ValuationConfig::load(&path).unwrap();
        assert_eq!(config.min_training_records, 25);
        assert_eq!(config.currency.symbol, "CAD ");
        assert_eq!(config.currency.grouping, ",");
        assert!((config.min_feature_coverage - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valuation.toml");
        fs::write(&path, "min_feature_coverage = 1.5\n").unwrap();
        assert!(ValuationConfig::load(&path).is_err());

        let config = ValuationConfig {
            singular_pivot_epsilon: 0.0,
            ..ValuationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
