use serde::{Deserialize, Serialize};

use super::{model::TrainedModel, predictor::estimate};
use crate::records::PropertyRecord;

/// Prediction for one evaluated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPrediction {
    /// Recorded value.
    pub actual: f64,
    /// Model estimate.
    pub predicted: f64,
    /// `predicted - actual`.
    pub error: f64,
    /// `error / actual * 100`.
    pub percent_error: f64,
}

/// Accuracy of a model over a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// `max(0, 1 - MAPE / 100)`.
    pub accuracy: f64,
    /// Root mean squared error, in currency units.
    pub rmse: f64,
    /// Squared Pearson correlation of actual and predicted values.
    pub r2: f64,
    /// Per-record detail, in input order.
    pub predictions: Vec<RecordPrediction>,
}

impl EvaluationResult {
    /// Number of records that contributed.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.predictions.len()
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    count: f64,
    squared_error: f64,
    absolute_percent_error: f64,
    sum_actual: f64,
    sum_predicted: f64,
    sum_actual_sq: f64,
    sum_predicted_sq: f64,
    sum_cross: f64,
}

impl Accumulator {
    fn push(&mut self, actual: f64, predicted: f64, error: f64, percent_error: f64) {
        self.count += 1.0;
        self.squared_error += error * error;
        self.absolute_percent_error += percent_error.abs();
        self.sum_actual += actual;
        self.sum_predicted += predicted;
        self.sum_actual_sq += actual * actual;
        self.sum_predicted_sq += predicted * predicted;
        self.sum_cross += actual * predicted;
    }

    fn pearson(&self) -> f64 {
        let n = self.count;
        let numerator = n.mul_add(self.sum_cross, -(self.sum_actual * self.sum_predicted));
        let actual_var = n.mul_add(self.sum_actual_sq, -(self.sum_actual * self.sum_actual));
        let predicted_var = n.mul_add(
            self.sum_predicted_sq,
            -(self.sum_predicted * self.sum_predicted),
        );
        let denominator = (actual_var * predicted_var).sqrt();
        if denominator.is_finite() && denominator > 0.0 {
            (numerator / denominator).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Runs the model over every record with a usable target.
#[must_use]
pub fn evaluate(model: &TrainedModel, records: &[PropertyRecord]) -> EvaluationResult {
    let mut acc = Accumulator::default();
    let mut predictions = Vec::with_capacity(records.len());
    for record in records {
        let Some(actual) = record.usable_target() else {
            continue;
        };
        let predicted = estimate(model, record);
        let error = predicted - actual;
        let percent_error = error / actual * 100.0;
        acc.push(actual, predicted, error, percent_error);
        predictions.push(RecordPrediction {
            actual,
            predicted,
            error,
            percent_error,
        });
    }

    if predictions.is_empty() {
        return EvaluationResult {
            accuracy: 0.0,
            rmse: 0.0,
            r2: 0.0,
            predictions,
        };
    }

    let mape = acc.absolute_percent_error / acc.count;
    let r = acc.pearson();
    EvaluationResult {
        accuracy: (1.0 - mape / 100.0).max(0.0),
        rmse: (acc.squared_error / acc.count).sqrt(),
        r2: r * r,
        predictions,
    }
}
