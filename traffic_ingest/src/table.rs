//! Record table construction
//!
//! Parses the located header and every following line into [`RawRecord`]s, then
//! coerces them into [`ObservedPoint`]s. Malformed rows are counted and skipped.

use crate::dates::{parse_french_date, DateParseError};
use crate::schema::locate_header;
use crate::{IngestError, IngestOptions, ObservedPoint, RawRecord, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use tracing::debug;

/// Counters describing what the row filters removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Zero-based line index of the header row
    pub header_line: usize,
    /// Data rows read after the header
    pub rows_read: usize,
    /// Rows repeating the header token in the sector column
    pub header_repeats: usize,
    /// Rows with a blank sector
    pub empty_sector: usize,
    /// Rows whose month name is not in the French table
    pub unknown_month: usize,
    /// Rows whose timestamp is otherwise not a date
    pub bad_date: usize,
    /// Rows whose traffic is empty, non-numeric or not finite
    pub bad_traffic: usize,
    /// Columns empty in every data row
    pub dropped_columns: Vec<String>,
}

impl IngestStats {
    /// Total rows discarded by the filters
    pub fn dropped(&self) -> usize {
        self.header_repeats + self.empty_sector + self.unknown_month + self.bad_date + self.bad_traffic
    }
}

/// Cleaned observations of one export
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    /// Kept column names, trimmed, in file order
    pub columns: Vec<String>,
    /// Observations in file order
    pub points: Vec<ObservedPoint>,
    /// Filter counters
    pub stats: IngestStats,
}

/// Column positions of the three required fields
struct RequiredColumns {
    sector: usize,
    timestamp: usize,
    traffic: usize,
}

fn find_column(columns: &[(usize, String)], name: &str) -> Result<usize> {
    columns
        .iter()
        .find(|(_, column)| column.eq_ignore_ascii_case(name))
        .map(|(idx, _)| *idx)
        .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
}

fn cell(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("").trim()
}

/// Parse a traffic cell into a finite number
fn parse_traffic(raw: &str, accept_decimal_comma: bool) -> Option<f64> {
    let value = match raw.parse::<f64>() {
        Ok(value) => value,
        Err(_) if accept_decimal_comma && !raw.contains('.') => {
            raw.replacen(',', ".", 1).parse::<f64>().ok()?
        }
        Err(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// Split the text at the header and read every row after it
fn read_rows(text: &str, options: &IngestOptions) -> Result<(usize, StringRecord, Vec<StringRecord>)> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    let header_line = locate_header(&lines, &options.header_markers());
    let body = lines[header_line..].join("\n");

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(header) => header?,
        None => return Err(IngestError::EmptyInput),
    };
    let rows = records.collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((header_line, header, rows))
}

/// Build the observation table from decoded export text
pub fn build_table(text: &str, options: &IngestOptions) -> Result<ParsedTable> {
    let (header_line, header, rows) = read_rows(text, options)?;
    let mut stats = IngestStats {
        header_line,
        ..IngestStats::default()
    };

    // Keep a column if any data row fills it; a header-only file keeps all columns.
    let mut kept = Vec::new();
    for (idx, name) in header.iter().enumerate() {
        let name = name.trim().to_string();
        let filled = rows.is_empty() || rows.iter().any(|row| !cell(row, idx).is_empty());
        if filled {
            kept.push((idx, name));
        } else {
            stats.dropped_columns.push(name);
        }
    }

    let required = RequiredColumns {
        sector: find_column(&kept, &options.sector_column)?,
        timestamp: find_column(&kept, &options.timestamp_column)?,
        traffic: find_column(&kept, &options.traffic_column)?,
    };
    let header_token = options.sector_column.to_lowercase();

    let mut points = Vec::with_capacity(rows.len());
    for row in &rows {
        stats.rows_read += 1;

        let entity_id = cell(row, required.sector);
        if entity_id.is_empty() {
            stats.empty_sector += 1;
            continue;
        }
        if entity_id.to_lowercase() == header_token {
            stats.header_repeats += 1;
            continue;
        }

        let record = RawRecord {
            entity_id: entity_id.to_string(),
            raw_timestamp: cell(row, required.timestamp).to_string(),
            raw_traffic: cell(row, required.traffic).to_string(),
            extra: kept
                .iter()
                .filter(|(idx, _)| {
                    ![required.sector, required.timestamp, required.traffic].contains(idx)
                })
                .map(|(idx, name)| (name.clone(), cell(row, *idx).to_string()))
                .collect::<BTreeMap<_, _>>(),
        };

        if let Some(point) = coerce_record(record, options, &mut stats) {
            points.push(point);
        }
    }

    debug!(
        rows = stats.rows_read,
        header_repeats = stats.header_repeats,
        unknown_month = stats.unknown_month,
        bad_date = stats.bad_date,
        bad_traffic = stats.bad_traffic,
        "filtered raw records"
    );

    Ok(ParsedTable {
        columns: kept.into_iter().map(|(_, name)| name).collect(),
        points,
        stats,
    })
}

/// Turn one raw record into an observation, counting the reason on failure
fn coerce_record(
    record: RawRecord,
    options: &IngestOptions,
    stats: &mut IngestStats,
) -> Option<ObservedPoint> {
    let date = match parse_french_date(&record.raw_timestamp, options.month_policy) {
        Ok(date) => date,
        Err(DateParseError::UnknownMonth(_)) => {
            stats.unknown_month += 1;
            return None;
        }
        Err(_) => {
            stats.bad_date += 1;
            return None;
        }
    };

    let Some(traffic) = parse_traffic(&record.raw_traffic, options.accept_decimal_comma) else {
        stats.bad_traffic += 1;
        return None;
    };

    Some(ObservedPoint {
        entity_id: record.entity_id,
        date,
        traffic,
        extra: record.extra,
    })
}
