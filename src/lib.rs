//! # Traffic Eval
//!
//! Umbrella crate for the traffic forecast backtest.
//!
//! - [`ingest`]: parsing of the raw French exports into typed observations
//! - [`forecast`]: regularization, holdout split, oracles and scoring
//!
//! ## Example
//!
//! ```
//! use traffic_eval_workspace::ingest::{parse_french_date, MonthPolicy};
//!
//! let date = parse_french_date("lundi 18 juin 2018", MonthPolicy::Strict).unwrap();
//! assert_eq!(date.to_string(), "2018-06-18");
//! ```

pub use traffic_forecast as forecast;
pub use traffic_ingest as ingest;
