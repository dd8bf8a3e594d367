//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};

fn paired_errors<'a>(actual: &'a [f64], predicted: &'a [f64]) -> Option<impl Iterator<Item = f64> + 'a> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return None;
    }
    Some(actual.iter().zip(predicted).map(|(a, p)| a - p))
}

/// Mean absolute error; NaN for empty or mismatched input
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    match paired_errors(actual, predicted) {
        Some(errors) => errors.map(f64::abs).sum::<f64>() / actual.len() as f64,
        None => f64::NAN,
    }
}

/// Mean squared error; NaN for empty or mismatched input
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    match paired_errors(actual, predicted) {
        Some(errors) => errors.map(|e| e.powi(2)).sum::<f64>() / actual.len() as f64,
        None => f64::NAN,
    }
}

/// Root mean squared error; NaN for empty or mismatched input
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(actual, predicted).sqrt()
}

/// Mean absolute percentage error over non-zero actuals, in percent
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() {
        return f64::NAN;
    }
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs() * 100.0)
        .collect();
    if terms.is_empty() {
        return f64::NAN;
    }
    terms.iter().sum::<f64>() / terms.len() as f64
}

/// Calculate accuracy metrics for predicted vs actual values
pub fn forecast_accuracy(actual: &[f64], predicted: &[f64]) -> Result<ForecastAccuracy> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    Ok(ForecastAccuracy {
        count: actual.len(),
        mae: mean_absolute_error(actual, predicted),
        mse: mean_squared_error(actual, predicted),
        rmse: root_mean_squared_error(actual, predicted),
        mape: mean_absolute_percentage_error(actual, predicted),
    })
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastAccuracy {
    /// Number of scored pairs
    pub count: usize,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, NaN when every actual is zero
    pub mape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics ({} sectors):", self.count)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        Ok(())
    }
}
