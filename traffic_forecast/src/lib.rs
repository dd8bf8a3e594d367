//! # Traffic Forecast
//!
//! Backtesting of one-step-ahead traffic forecasts per network sector.
//!
//! ## Features
//!
//! - Weekly regularization of sparse, irregular sector observations
//! - Context / ground-truth split holding out the last week of every sector
//! - Pluggable forecasting oracles: a remote model server or local baselines
//!   (Exponential Smoothing, Moving Average)
//! - Scoring with RMSE, MAE and MAPE, persisted as a results table
//! - Inspection and reporting helpers for the command line tool
//!
//! ## Quick Start
//!
//! ```no_run
//! use traffic_forecast::config::EvalConfig;
//! use traffic_forecast::evaluation::Evaluator;
//! use traffic_forecast::models::exponential_smoothing::ExponentialSmoothing;
//! use traffic_forecast::oracle::LocalForecaster;
//! use traffic_forecast::pipeline::prepare_file;
//!
//! let config = EvalConfig::default();
//! let prepared = prepare_file("histo_trafic.csv", &config.ingest, &config.regularize)?;
//!
//! let oracle = LocalForecaster::new(ExponentialSmoothing::new(0.5)?);
//! let evaluator = Evaluator::new(oracle, config.evaluation.clone())?;
//! let report = evaluator.run_and_persist(&prepared.splits, &config.output_path)?;
//!
//! println!("RMSE over {} sectors: {:.3}", report.results.len(), report.rmse());
//! # Ok::<(), traffic_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod inspect;
pub mod metrics;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod split;

// Re-export commonly used types
pub use crate::config::{EvalConfig, OracleConfig};
pub use crate::data::{regularize, RegularizeOptions, Series, SeriesPoint};
pub use crate::error::ForecastError;
pub use crate::evaluation::{EvaluationOptions, EvaluationReport, Evaluator};
pub use crate::models::{ForecastModel, ForecastResult};
pub use crate::oracle::{EntityForecast, ForecastRequest, Forecaster};
pub use crate::results::{PredictionResult, ResultsTable};
pub use crate::split::{split_all, ContextWindow, GroundTruthPoint, SplitSet};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
