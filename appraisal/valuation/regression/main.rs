//! Regression engine: training orchestration and the trained/untrained state.

/// Ranked standardized coefficients.
pub mod importance;
/// Accuracy metrics over record sets.
pub mod evaluator;
/// Immutable trained model.
pub mod model;
/// Column statistics and z-score normalization.
pub mod normalizer;
/// Single-record prediction.
pub mod predictor;
/// Training outcome reporting.
pub mod reporter;
/// Normal-equation solver.
pub mod solver;

use std::sync::Arc;

use appraisal_logging::LogLevel;
use serde_json::{json, Value};

use evaluator::EvaluationResult;
use importance::FeatureImportance;
use model::TrainedModel;
use normalizer::TrainingStatistics;
use predictor::PredictionResult;
use reporter::{TrainingMetrics, TrainingResult};
use solver::NormalEquationSolver;

use crate::{
    config::ValuationConfig,
    currency::{CurrencyFormatter, ValueFormatter},
    error::{ValuationError, ValuationResult},
    records::{FeatureSet, PropertyRecord},
    telemetry::ValuationTelemetry,
};

/// Property value model: `train`, then `predict` / `evaluate` /
/// `feature_importance`, and `reset` to start over.
///
/// A successful `train` swaps in a complete [`TrainedModel`]; a failed one
/// leaves the engine untrained. Queries take `&self`, training takes
/// `&mut self`, so a query can never observe a half-trained model.
#[derive(Debug)]
pub struct ValuationModel {
    config: ValuationConfig,
    solver: NormalEquationSolver,
    formatter: Arc<dyn ValueFormatter>,
    state: Option<Arc<TrainedModel>>,
    telemetry: Option<ValuationTelemetry>,
}

impl Default for ValuationModel {
    fn default() -> Self {
        Self::new(ValuationConfig::default())
    }
}

impl ValuationModel {
    /// Untrained engine using `config`.
    #[must_use]
    pub fn new(config: ValuationConfig) -> Self {
        Self {
            solver: NormalEquationSolver::new(config.singular_pivot_epsilon),
            formatter: Arc::new(CurrencyFormatter::new(config.currency.clone())),
            config,
            state: None,
            telemetry: None,
        }
    }

    /// Replaces the currency formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl ValueFormatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    /// Attaches telemetry sinks for structured logging/events.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: ValuationTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Whether a model is loaded.
    #[must_use]
    pub const fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    /// Shared handle to the trained model, for read-only use elsewhere.
    #[must_use]
    pub fn model(&self) -> Option<Arc<TrainedModel>> {
        self.state.clone()
    }

    /// Fits the model. Any previous model is discarded first, so a failed run
    /// leaves the engine untrained.
    pub fn train<S: AsRef<str>>(
        &mut self,
        features: &[S],
        records: &[PropertyRecord],
    ) -> TrainingResult {
        let features = FeatureSet::new(features);
        self.state = None;
        self.log(
            LogLevel::Info,
            "valuation.train.start",
            json!({ "features": features.names(), "records": records.len() }),
        );

        if let Err(err) = self.validate(&features, records) {
            self.log(
                LogLevel::Warn,
                "valuation.train.rejected",
                json!({ "features": features.names(), "error": err.to_string() }),
            );
            self.event(
                "valuation.model.training_failed",
                json!({ "features": features.names(), "error": err.to_string() }),
            );
            return TrainingResult::failure(features, err);
        }

        let model = match self.fit(&features, records) {
            Ok(model) => model,
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    "valuation.train.failed",
                    json!({ "features": features.names(), "error": err.to_string() }),
                );
                self.event(
                    "valuation.model.training_failed",
                    json!({ "features": features.names(), "error": err.to_string() }),
                );
                return TrainingResult::failure(features, err);
            }
        };

        let metrics = TrainingMetrics::from(&evaluator::evaluate(&model, records));
        self.log(
            LogLevel::Info,
            "valuation.train.complete",
            json!({
                "model_id": model.id(),
                "trained_at": model.trained_at(),
                "samples": metrics.samples,
                "r2": metrics.r2,
                "rmse": metrics.rmse,
                "intercept": model.intercept(),
            }),
        );
        self.event(
            "valuation.model.trained",
            json!({
                "model_id": model.id(),
                "trained_at": model.trained_at(),
                "features": features.names(),
                "r2": metrics.r2,
                "rmse": metrics.rmse,
            }),
        );
        self.state = Some(Arc::new(model));
        TrainingResult::success(features, metrics)
    }

    /// Estimates the value of one property.
    pub fn predict(&self, record: &PropertyRecord) -> ValuationResult<PredictionResult> {
        let model = self.trained()?;
        Ok(predictor::predict(
            model,
            record,
            self.config.missing_feature_penalty,
            self.formatter.as_ref(),
        ))
    }

    /// Scores the model against records with known values.
    pub fn evaluate(&self, records: &[PropertyRecord]) -> ValuationResult<EvaluationResult> {
        let model = self.trained()?;
        Ok(evaluator::evaluate(model, records))
    }

    /// Features ordered by standardized coefficient, most influential first.
    pub fn feature_importance(&self) -> ValuationResult<Vec<FeatureImportance>> {
        Ok(self.trained()?.importance().to_vec())
    }

    /// Drops the trained model.
    pub fn reset(&mut self) {
        let previous = self.state.take();
        self.log(
            LogLevel::Info,
            "valuation.reset",
            json!({ "model_id": previous.as_ref().map(|model| model.id()) }),
        );
        if let Some(model) = previous {
            self.event("valuation.model.reset", json!({ "model_id": model.id() }));
        }
    }

    fn trained(&self) -> ValuationResult<&TrainedModel> {
        self.state.as_deref().ok_or(ValuationError::NotTrained)
    }

    fn validate(&self, features: &FeatureSet, records: &[PropertyRecord]) -> ValuationResult<()> {
        if features.is_empty() {
            return Err(ValuationError::NoFeatures);
        }
        let required = self.config.min_training_records;
        if records.len() < required {
            return Err(ValuationError::InsufficientData {
                required,
                provided: records.len(),
            });
        }

        let min_coverage = self.config.min_feature_coverage;
        for feature in features.iter() {
            let present = records.iter().filter(|r| r.is_present(feature)).count();
            let ratio = coverage(present, records.len());
            if ratio < min_coverage {
                return Err(ValuationError::InsufficientCoverage {
                    attribute: feature.clone(),
                    ratio,
                });
            }
        }
        let with_target = records.iter().filter(|r| r.has_target()).count();
        let ratio = coverage(with_target, records.len());
        if ratio < min_coverage {
            return Err(ValuationError::InsufficientCoverage {
                attribute: "assessedValue".into(),
                ratio,
            });
        }
        Ok(())
    }

    fn fit(
        &self,
        features: &FeatureSet,
        records: &[PropertyRecord],
    ) -> ValuationResult<TrainedModel> {
        let stats = TrainingStatistics::compute(features, records);
        let design = normalizer::normalize(features, records, &stats)?;
        self.log(
            LogLevel::Debug,
            "valuation.train.normalized",
            json!({ "rows": design.x.nrows(), "columns": design.x.ncols() }),
        );
        let solution = self.solver.solve(&design.x, &design.y)?;
        Ok(TrainedModel::new(features.clone(), solution, stats))
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(telemetry) = self.telemetry.as_ref() {
            let _ = telemetry.log(level, message, metadata);
        }
    }

    fn event(&self, event_type: &str, payload: Value) {
        if let Some(telemetry) = self.telemetry.as_ref() {
            let _ = telemetry.event(event_type, payload);
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn coverage(present: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        present as f64 / total as f64
    }
}
