//! Simple moving average

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Simple Moving Average model
#[derive(Debug, Clone)]
pub struct SimpleMA {
    /// Name of the model
    name: String,
    /// Window size
    window: usize,
}

/// Trained Simple Moving Average model
#[derive(Debug, Clone)]
pub struct TrainedSimpleMA {
    /// Name of the model
    name: String,
    /// Last calculated average
    last_average: f64,
}

impl SimpleMA {
    /// Create a new Simple Moving Average model
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Simple Moving Average (window={})", window),
            window,
        })
    }

    /// Get the window size
    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for SimpleMA {
    type Trained = TrainedSimpleMA;

    fn train(&self, values: &[f64]) -> Result<Self::Trained> {
        if values.len() < self.window {
            return Err(ForecastError::ValidationError(format!(
                "Insufficient data for SMA. Need at least {} observations.",
                self.window
            )));
        }

        let last_average =
            values[values.len() - self.window..].iter().sum::<f64>() / self.window as f64;

        Ok(TrainedSimpleMA {
            name: self.name.clone(),
            last_average,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedSimpleMA {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        // For simple MA, the forecast is constant at the last average
        ForecastResult::new(vec![self.last_average; horizon], horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
