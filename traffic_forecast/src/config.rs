//! Run configuration
//!
//! A TOML file groups the settings of every stage. Missing sections fall back
//! to the defaults of the export layout and the weekly grid.
//!
//! ```toml
//! input_path = "data/traffic.csv"
//! output_path = "prediction_results.csv"
//!
//! [regularize]
//! step_days = 7
//! min_observations = 10
//!
//! [oracle]
//! kind = "http"
//! endpoint = "http://127.0.0.1:8000/predict"
//! timeout_secs = 120
//! ```

use crate::data::RegularizeOptions;
use crate::error::{ForecastError, Result};
use crate::evaluation::EvaluationOptions;
use crate::models::exponential_smoothing::ExponentialSmoothing;
use crate::models::moving_average::SimpleMA;
use crate::oracle::{Forecaster, HttpForecaster, LocalForecaster};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use traffic_ingest::IngestOptions;

/// Default location of the results artifact
pub const DEFAULT_OUTPUT_PATH: &str = "prediction_results.csv";

/// Default model server endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/predict";

/// Which forecaster answers the evaluation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OracleConfig {
    /// Remote model server
    Http {
        endpoint: String,
        /// No timeout when absent
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Local exponential smoothing baseline
    ExpSmoothing { alpha: f64 },
    /// Local moving-average baseline
    MovingAverage { window: usize },
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self::Http {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: None,
        }
    }
}

impl OracleConfig {
    /// Build the configured forecaster
    pub fn build(&self) -> Result<Box<dyn Forecaster>> {
        let forecaster: Box<dyn Forecaster> = match self {
            Self::Http {
                endpoint,
                timeout_secs,
            } => Box::new(HttpForecaster::new(
                endpoint.clone(),
                timeout_secs.map(Duration::from_secs),
            )?),
            Self::ExpSmoothing { alpha } => {
                Box::new(LocalForecaster::new(ExponentialSmoothing::new(*alpha)?))
            }
            Self::MovingAverage { window } => {
                Box::new(LocalForecaster::new(SimpleMA::new(*window)?))
            }
        };
        Ok(forecaster)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Http { endpoint, .. } if endpoint.trim().is_empty() => Err(
                ForecastError::ConfigError("oracle endpoint is empty".to_string()),
            ),
            Self::ExpSmoothing { alpha } if !(*alpha > 0.0 && *alpha < 1.0) => Err(
                ForecastError::ConfigError(format!("alpha must be in (0, 1), got {}", alpha)),
            ),
            Self::MovingAverage { window: 0 } => Err(ForecastError::ConfigError(
                "moving average window must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Settings for one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Raw export; the command line may supply it instead
    pub input_path: Option<PathBuf>,
    /// Where the results table is written
    pub output_path: PathBuf,
    pub ingest: IngestOptions,
    pub regularize: RegularizeOptions,
    pub evaluation: EvaluationOptions,
    pub oracle: OracleConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            ingest: IngestOptions::default(),
            regularize: RegularizeOptions::default(),
            evaluation: EvaluationOptions::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Load and validate a TOML file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_str(&content)
    }

    /// Parse and validate TOML text
    pub fn parse_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage can run with
    pub fn validate(&self) -> Result<()> {
        if self.regularize.step_days == 0 {
            return Err(ForecastError::ConfigError(
                "regularize.step_days must be positive".to_string(),
            ));
        }
        if self.regularize.min_observations < 2 {
            return Err(ForecastError::ConfigError(
                "regularize.min_observations must be at least 2".to_string(),
            ));
        }
        if self.evaluation.prediction_length == 0 {
            return Err(ForecastError::ConfigError(
                "evaluation.prediction_length must be positive".to_string(),
            ));
        }
        let q = self.evaluation.quantile;
        if !(q > 0.0 && q < 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "evaluation.quantile must be in (0, 1), got {}",
                q
            )));
        }
        self.oracle.validate()
    }
}
