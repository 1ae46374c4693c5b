//! Forecast accuracy scoring.
//!
//! RMSE and MAE are always defined. MASE divides MAE by the in-sample
//! mean absolute error of the seasonal naive benchmark on the training
//! window; when that benchmark error is zero (a constant or perfectly
//! seasonal training series) the ratio is undefined and the score is
//! `None` rather than infinity. Each method's MASE uses its own training
//! target as the scale, so scores are comparable within a method's own
//! units.

use crate::error::{PipelineError, Result};

/// Accuracy of one forecast against held-out actuals.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastScore {
    pub rmse: f64,
    pub mae: f64,
    /// `None` when the naive benchmark error on the training window is
    /// zero, which leaves the scaled error undefined.
    pub mase: Option<f64>,
}

/// Score `predicted` against `actual`, scaling MASE by the seasonal
/// naive error of `train` at lag `seasonal_period`.
pub fn score_forecast(
    train: &[f64],
    actual: &[f64],
    predicted: &[f64],
    seasonal_period: usize,
) -> Result<ForecastScore> {
    if actual.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if seasonal_period == 0 {
        return Err(PipelineError::InvalidParameter(
            "seasonal period must be at least 1".to_string(),
        ));
    }

    let n = actual.len() as f64;
    let mut sq_sum = 0.0;
    let mut abs_sum = 0.0;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        let err = a - p;
        sq_sum += err * err;
        abs_sum += err.abs();
    }
    let rmse = (sq_sum / n).sqrt();
    let mae = abs_sum / n;

    Ok(ForecastScore {
        rmse,
        mae,
        mase: naive_scale(train, seasonal_period).map(|scale| mae / scale),
    })
}

/// Mean absolute error of the seasonal naive forecast on the training
/// window, or `None` when it is zero or cannot be formed.
fn naive_scale(train: &[f64], seasonal_period: usize) -> Option<f64> {
    if train.len() <= seasonal_period {
        return None;
    }
    let errors: Vec<f64> = (seasonal_period..train.len())
        .map(|t| (train[t] - train[t - seasonal_period]).abs())
        .collect();
    let scale = errors.iter().sum::<f64>() / errors.len() as f64;
    if scale > 0.0 {
        Some(scale)
    } else {
        None
    }
}
