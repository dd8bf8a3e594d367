//! Forecasting oracle abstraction
//!
//! The evaluation harness sends every context window in one batched request and
//! receives quantile point forecasts keyed by sector id. Implementations may call
//! a remote model server or run a local baseline.

use crate::error::Result;
use crate::split::ContextWindow;
use std::collections::BTreeMap;

pub mod http;
pub mod local;

pub use http::HttpForecaster;
pub use local::LocalForecaster;

/// Batched forecast request
#[derive(Debug, Clone, Copy)]
pub struct ForecastRequest<'a> {
    /// One context window per sector
    pub series: &'a [ContextWindow],
    /// Steps to forecast past the end of each context
    pub prediction_length: usize,
    /// Requested quantile levels, e.g. `[0.5]`
    pub quantile_levels: &'a [f64],
}

/// Forecast for one sector
#[derive(Debug, Clone, PartialEq)]
pub struct EntityForecast {
    /// Sector identifier
    pub entity_id: String,
    /// Forecast values per quantile key (see [`quantile_key`]), one per step
    pub quantiles: BTreeMap<String, Vec<f64>>,
}

impl EntityForecast {
    /// First-step forecast at `level`, if present
    pub fn point(&self, level: f64) -> Option<f64> {
        self.quantiles
            .get(&quantile_key(level))
            .and_then(|values| values.first().copied())
    }
}

/// String key under which a quantile level is reported, e.g. `0.5` → `"0.5"`
pub fn quantile_key(level: f64) -> String {
    format!("{}", level)
}

/// A source of quantile point forecasts
pub trait Forecaster {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Forecast every series in the request with a single call
    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Vec<EntityForecast>>;
}

impl<F: Forecaster + ?Sized> Forecaster for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Vec<EntityForecast>> {
        (**self).predict(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_keys() {
        assert_eq!(quantile_key(0.5), "0.5");
        assert_eq!(quantile_key(0.1), "0.1");
        assert_eq!(quantile_key(0.95), "0.95");
    }

    #[test]
    fn test_point_lookup() {
        let forecast = EntityForecast {
            entity_id: "A1".to_string(),
            quantiles: BTreeMap::from([("0.5".to_string(), vec![12.0, 13.0])]),
        };
        assert_eq!(forecast.point(0.5), Some(12.0));
        assert_eq!(forecast.point(0.9), None);
    }
}
