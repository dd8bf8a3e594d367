//! Simple exponential smoothing

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Simple exponential smoothing model
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Smoothing parameter
    alpha: f64,
}

/// Trained exponential smoothing model
#[derive(Debug, Clone)]
pub struct TrainedExponentialSmoothing {
    /// Name of the model
    name: String,
    /// Final smoothed level
    level: f64,
}

impl ExponentialSmoothing {
    /// Create a new exponential smoothing model
    pub fn new(alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Alpha must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Exponential Smoothing (alpha={})", alpha),
            alpha,
        })
    }

    /// Get the smoothing parameter
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl ForecastModel for ExponentialSmoothing {
    type Trained = TrainedExponentialSmoothing;

    fn train(&self, values: &[f64]) -> Result<Self::Trained> {
        let Some((&first, rest)) = values.split_first() else {
            return Err(ForecastError::DataError("Empty time series data".to_string()));
        };

        // Initialize level with first observation
        let level = rest
            .iter()
            .fold(first, |level, &value| self.alpha * value + (1.0 - self.alpha) * level);

        Ok(TrainedExponentialSmoothing {
            name: self.name.clone(),
            level,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedExponentialSmoothing {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        // Flat forecast at the last level
        ForecastResult::new(vec![self.level; horizon], horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
