use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use appraisal_events::FileEventPublisher;
use appraisal_logging::LogLevel;
use appraisal_valuation::{
    load_records, synthetic_records, EvaluationResult, FeatureImportance, PredictionResult,
    TrainingResult, ValuationConfig, ValuationModel, ValuationTelemetry,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "appraise",
    version,
    about = "Property value regression: train, predict, evaluate"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trains a model and prints fit metrics and feature importance.
    Train(TrainArgs),
    /// Trains a model, then estimates every record in the subject file.
    Predict {
        #[command(flatten)]
        train: TrainArgs,
        /// JSON or JSON-lines file of properties to value.
        #[arg(long)]
        subject: PathBuf,
    },
    /// Trains a model, then scores it against a holdout file.
    Evaluate {
        #[command(flatten)]
        train: TrainArgs,
        /// JSON or JSON-lines file of properties with known values.
        #[arg(long)]
        holdout: PathBuf,
    },
    /// Writes a synthetic residential dataset as a JSON array.
    Synth {
        /// Number of properties.
        #[arg(long, default_value_t = 100)]
        count: usize,
        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct TrainArgs {
    /// JSON or JSON-lines file of training properties.
    #[arg(long)]
    records: PathBuf,
    /// Comma-separated attribute names, in model order.
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,
    /// TOML engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON-lines log destination.
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: LogLevel,
    /// JSON-lines model event destination.
    #[arg(long)]
    event_log: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct TrainReport {
    result: TrainingResult,
    importance: Vec<FeatureImportance>,
}

#[derive(Debug, Serialize)]
struct SubjectPrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    prediction: PredictionResult,
}

#[derive(Debug, Serialize)]
struct EvaluateReport {
    training: TrainingResult,
    holdout: EvaluationResult,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Train(args) => {
            let report = handle_train(&args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            ensure_trained(&report.result)
        }
        Commands::Predict { train, subject } => {
            let predictions = handle_predict(&train, &subject)?;
            println!("{}", serde_json::to_string_pretty(&predictions)?);
            Ok(())
        }
        Commands::Evaluate { train, holdout } => {
            let report = handle_evaluate(&train, &holdout)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Synth {
            count,
            seed,
            output,
        } => {
            handle_synth(count, seed, &output)?;
            println!("wrote {count} synthetic properties to {}", output.display());
            Ok(())
        }
    }
}

fn handle_train(args: &TrainArgs) -> Result<TrainReport> {
    let (model, result) = train_model(args)?;
    let importance = if result.trained {
        model.feature_importance()?
    } else {
        Vec::new()
    };
    Ok(TrainReport { result, importance })
}

fn handle_predict(args: &TrainArgs, subject: &Path) -> Result<Vec<SubjectPrediction>> {
    let (model, result) = train_model(args)?;
    ensure_trained(&result)?;
    let subjects = load_records(subject)
        .with_context(|| format!("loading subject properties {}", subject.display()))?;
    subjects
        .into_iter()
        .map(|record| -> Result<SubjectPrediction> {
            let prediction = model.predict(&record)?;
            Ok(SubjectPrediction {
                id: record.id,
                prediction,
            })
        })
        .collect()
}

fn handle_evaluate(args: &TrainArgs, holdout: &Path) -> Result<EvaluateReport> {
    let (model, training) = train_model(args)?;
    ensure_trained(&training)?;
    let records = load_records(holdout)
        .with_context(|| format!("loading holdout properties {}", holdout.display()))?;
    let holdout = model.evaluate(&records)?;
    Ok(EvaluateReport { training, holdout })
}

fn handle_synth(count: usize, seed: u64, output: &Path) -> Result<()> {
    anyhow::ensure!(count > 0, "count must be positive");
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let records = synthetic_records(count, seed);
    fs::write(output, serde_json::to_string_pretty(&records)?)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn train_model(args: &TrainArgs) -> Result<(ValuationModel, TrainingResult)> {
    let config = match &args.config {
        Some(path) => ValuationConfig::load(path)?,
        None => ValuationConfig::default(),
    };
    let records = load_records(&args.records)
        .with_context(|| format!("loading training properties {}", args.records.display()))?;
    let mut model = ValuationModel::new(config);
    if let Some(telemetry) = build_telemetry(args)? {
        model = model.with_telemetry(telemetry);
    }
    let result = model.train(args.features.as_slice(), &records);
    Ok((model, result))
}

fn build_telemetry(args: &TrainArgs) -> Result<Option<ValuationTelemetry>> {
    if args.log_file.is_none() && args.event_log.is_none() {
        return Ok(None);
    }
    let mut builder = ValuationTelemetry::builder("appraise").min_level(args.log_level);
    if let Some(path) = &args.log_file {
        builder = builder.log_path(path);
    }
    if let Some(path) = &args.event_log {
        builder = builder.event_publisher(Arc::new(FileEventPublisher::new(path)?));
    }
    builder.build().map(Some)
}

fn ensure_trained(result: &TrainingResult) -> Result<()> {
    if result.trained {
        Ok(())
    } else {
        bail!(
            "{}",
            result
                .error
                .clone()
                .unwrap_or_else(|| "training failed".into())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn train_args(records: PathBuf, dir: &Path) -> TrainArgs {
        TrainArgs {
            records,
            features: vec!["squareFeet".into(), "bedrooms".into(), "yearBuilt".into()],
            config: None,
            log_file: Some(dir.join("logs/appraise.log")),
            log_level: LogLevel::Info,
            event_log: Some(dir.join("logs/events.jsonl")),
        }
    }

    #[test]
    fn parses_comma_separated_features() {
        let cli = Cli::try_parse_from([
            "appraise",
            "train",
            "--records",
            "homes.json",
            "--features",
            "squareFeet,bedrooms",
            "--log-level",
            "warn",
        ])
        .unwrap();
        match cli.command {
            Commands::Train(args) => {
                assert_eq!(args.features, ["squareFeet", "bedrooms"]);
                assert_eq!(args.log_level, LogLevel::Warn);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn synth_then_train_predict_evaluate() {
        let dir = tempdir().unwrap();
        let training = dir.path().join("data/train.json");
        let holdout = dir.path().join("data/holdout.json");
        handle_synth(40, 1, &training).unwrap();
        handle_synth(15, 2, &holdout).unwrap();
        let args = train_args(training, dir.path());

        let report = handle_train(&args).unwrap();
        assert!(report.result.trained);
        assert_eq!(report.importance.len(), 3);

        let predictions = handle_predict(&args, &holdout).unwrap();
        assert_eq!(predictions.len(), 15);
        assert!(predictions.iter().all(|p| p.prediction.value >= 0.0));
        assert!(predictions[0].id.is_some());

        let evaluation = handle_evaluate(&args, &holdout).unwrap();
        assert_eq!(evaluation.holdout.predictions.len(), 15);

        let log = fs::read_to_string(dir.path().join("logs/appraise.log")).unwrap();
        assert!(log.contains("valuation.train.complete"));
        let events = fs::read_to_string(dir.path().join("logs/events.jsonl")).unwrap();
        assert!(events.contains("valuation.model.trained"));
    }

    #[test]
    fn predict_refuses_untrained_model() {
        let dir = tempdir().unwrap();
        let training = dir.path().join("tiny.json");
        handle_synth(4, 9, &training).unwrap();
        let args = train_args(training.clone(), dir.path());
        let err = handle_predict(&args, &training).unwrap_err();
        assert!(err.to_string().contains("insufficient data"));
    }
}
