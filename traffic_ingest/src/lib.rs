//! # Traffic Ingest
//!
//! `traffic_ingest` turns semi-structured, Latin-1 encoded traffic measurement logs
//! into flat, typed observations.
//!
//! The source files are exported from a monitoring tool and are messy in a few
//! predictable ways:
//!
//! - **Preamble lines**: the real header row may be preceded by report titles or blank lines
//! - **Verbose French dates**: timestamps look like `lundi 18 juin 2018`
//! - **Repeated headers**: concatenated exports repeat the header mid-file
//! - **Dirty values**: empty columns, blank traffic cells, non-numeric garbage
//!
//! Row-level problems are filtered, never raised. Only a structurally unreadable
//! file (I/O failure, missing required columns) is an error.
//!
//! ## Usage Example
//!
//! ```no_run
//! use traffic_ingest::{load_file, IngestOptions};
//!
//! let table = load_file("histo_trafic.csv", &IngestOptions::default())?;
//! println!("{} observations, {} rows dropped", table.points.len(), table.stats.dropped());
//! # Ok::<(), traffic_ingest::IngestError>(())
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod dates;
pub mod schema;
pub mod table;
pub mod utils;

pub use dates::{normalize_french_date, parse_french_date, DateParseError, MonthPolicy};
pub use schema::{locate_header, HeaderMarkers};
pub use table::{build_table, IngestStats, ParsedTable};
pub use utils::{decode_latin1, load_file};

/// Errors that abort ingestion of a whole file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Required column '{0}' not found in header")]
    MissingColumn(String),

    #[error("Input contains no lines")]
    EmptyInput,
}

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// One data row as found in the file, before any coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Sector identifier, trimmed
    pub entity_id: String,
    /// Verbose timestamp, e.g. `lundi 18 juin 2018`
    pub raw_timestamp: String,
    /// Traffic cell as text
    pub raw_traffic: String,
    /// Every other kept column, keyed by trimmed column name
    pub extra: BTreeMap<String, String>,
}

/// A cleaned measurement for one sector on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedPoint {
    /// Sector identifier
    pub entity_id: String,
    /// Measurement date
    pub date: NaiveDate,
    /// Traffic in Mbps, always finite
    pub traffic: f64,
    /// Passthrough columns of the source row, keyed by column name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ObservedPoint {
    /// Create an observation without passthrough columns
    pub fn new(entity_id: impl Into<String>, date: NaiveDate, traffic: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            date,
            traffic,
            extra: BTreeMap::new(),
        }
    }
}

/// Column names and parsing switches for one input layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Name of the entity column, also the token used to spot repeated headers
    pub sector_column: String,
    /// Name of the verbose date column
    pub timestamp_column: String,
    /// Name of the traffic column
    pub traffic_column: String,
    /// What to do with month names outside the French table
    pub month_policy: MonthPolicy,
    /// Accept `12,5` as 12.5 when the cell has no `.`
    pub accept_decimal_comma: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            sector_column: "secteur".to_string(),
            timestamp_column: "tstamp".to_string(),
            traffic_column: "trafic_mbps".to_string(),
            month_policy: MonthPolicy::Strict,
            accept_decimal_comma: false,
        }
    }
}

impl IngestOptions {
    /// Markers used to find the header row
    pub fn header_markers(&self) -> HeaderMarkers {
        HeaderMarkers::new(&self.sector_column, &self.timestamp_column)
    }
}
