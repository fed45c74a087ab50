#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Property value regression engine: ordinary least squares fitted through the
//! normal equation, with missing-feature tolerant prediction, accuracy
//! evaluation, and feature importance ranking.

/// Property records and feature sets.
#[path = "../records.rs"]
pub mod records;

/// Engine configuration.
#[path = "../config.rs"]
pub mod config;

/// Error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Currency formatting for predicted values.
#[path = "../currency.rs"]
pub mod currency;

/// Structured logging and lifecycle events.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Record loading and synthetic datasets.
#[path = "../dataset.rs"]
pub mod dataset;

/// Regression model: normalizer, solver, predictor, evaluator, ranker.
#[path = "../regression/main.rs"]
pub mod regression;

pub use config::ValuationConfig;
pub use currency::{CurrencyConfig, CurrencyFormatter, ValueFormatter};
pub use dataset::{load_records, synthetic_records, DatasetError};
pub use error::{ValuationError, ValuationResult};
pub use records::{AttributeValue, FeatureSet, PropertyRecord};
pub use regression::{
    evaluator::{EvaluationResult, RecordPrediction},
    importance::FeatureImportance,
    model::TrainedModel,
    normalizer::{SummaryStats, TrainingStatistics},
    predictor::PredictionResult,
    reporter::{TrainingMetrics, TrainingResult},
    ValuationModel,
};
pub use telemetry::{ValuationTelemetry, ValuationTelemetryBuilder};
