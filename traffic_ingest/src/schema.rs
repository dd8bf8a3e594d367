//! Header row discovery
//!
//! Exports often start with a title block before the real header. The header is
//! the first line mentioning both the sector and the timestamp column names.

use tracing::{debug, warn};

/// Case-insensitive tokens that identify the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMarkers {
    sector: String,
    timestamp: String,
}

impl HeaderMarkers {
    /// Create markers from the sector and timestamp column names
    pub fn new(sector: &str, timestamp: &str) -> Self {
        Self {
            sector: sector.to_lowercase(),
            timestamp: timestamp.to_lowercase(),
        }
    }

    /// Whether `line` carries both markers
    pub fn matches(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        lower.contains(&self.sector) && lower.contains(&self.timestamp)
    }
}

impl Default for HeaderMarkers {
    fn default() -> Self {
        Self::new("secteur", "tstamp")
    }
}

/// Index of the header line.
///
/// Falls back to `0` when no line carries both markers. The caller then treats
/// the first line as the header, which may silently misparse the file, so the
/// fallback is logged.
pub fn locate_header<S: AsRef<str>>(lines: &[S], markers: &HeaderMarkers) -> usize {
    match lines.iter().position(|line| markers.matches(line.as_ref())) {
        Some(idx) => {
            debug!(header_line = idx, "located header row");
            idx
        }
        None => {
            warn!(
                lines = lines.len(),
                "no header row found, treating the first line as header"
            );
            0
        }
    }
}
