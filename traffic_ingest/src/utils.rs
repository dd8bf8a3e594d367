//! File loading helpers
//!
//! Exports are written in Latin-1. Every byte maps to the code point with the
//! same value, so decoding cannot fail.

use crate::table::{build_table, ParsedTable};
use crate::{IngestOptions, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Decode Latin-1 (ISO-8859-1) bytes into a string
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Load and parse a traffic export
///
/// # Arguments
/// * `path` - Path to the `;`-delimited Latin-1 export
/// * `options` - Column names and parsing switches
///
/// # Returns
/// * `Result<ParsedTable>` - Cleaned observations with filter statistics
pub fn load_file<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<ParsedTable> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let text = decode_latin1(&bytes);
    let table = build_table(&text, options)?;

    info!(
        path = %path.display(),
        header_line = table.stats.header_line,
        rows = table.stats.rows_read,
        kept = table.points.len(),
        dropped = table.stats.dropped(),
        "loaded traffic export"
    );

    Ok(table)
}
