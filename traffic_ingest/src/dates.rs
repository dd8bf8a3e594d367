//! French verbose date parsing
//!
//! Timestamps in the export look like `lundi 18 juin 2018`: weekday, day of
//! month, month name, year. The weekday is ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// French month names and their two-digit numbers
const MONTHS: [(&str, &str); 12] = [
    ("janvier", "01"),
    ("février", "02"),
    ("mars", "03"),
    ("avril", "04"),
    ("mai", "05"),
    ("juin", "06"),
    ("juillet", "07"),
    ("août", "08"),
    ("septembre", "09"),
    ("octobre", "10"),
    ("novembre", "11"),
    ("décembre", "12"),
];

/// Why a timestamp could not be turned into a date
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("expected '<weekday> <day> <month> <year>', got {0:?}")]
    TooFewTokens(String),

    #[error("unknown month name {0:?}")]
    UnknownMonth(String),

    #[error("not a calendar date: {0:?}")]
    InvalidDate(String),
}

/// Handling of month names missing from the French table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthPolicy {
    /// Reject the timestamp with [`DateParseError::UnknownMonth`]
    #[default]
    Strict,
    /// Legacy export behavior: assume January
    DefaultJanuary,
}

fn month_number(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == lower)
        .map(|(_, number)| *number)
}

/// Rewrite a verbose French date as `YYYY-MM-DD`.
///
/// The day is zero-padded to two digits but not range-checked, so
/// `"lundi 32 juin 2018"` yields `"2018-06-32"`. Use [`parse_french_date`] to get a
/// validated calendar date.
pub fn normalize_french_date(input: &str, policy: MonthPolicy) -> Result<String, DateParseError> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(DateParseError::TooFewTokens(input.to_string()));
    }

    let (day, month_name, year) = (parts[1], parts[2], parts[3]);
    let month = match (month_number(month_name), policy) {
        (Some(month), _) => month,
        (None, MonthPolicy::DefaultJanuary) => "01",
        (None, MonthPolicy::Strict) => {
            return Err(DateParseError::UnknownMonth(month_name.to_string()))
        }
    };

    Ok(format!("{}-{}-{:0>2}", year, month, day))
}

/// Parse a verbose French date into a calendar date
pub fn parse_french_date(input: &str, policy: MonthPolicy) -> Result<NaiveDate, DateParseError> {
    let iso = normalize_french_date(input, policy)?;
    coerce_iso_date(&iso).ok_or(DateParseError::InvalidDate(iso))
}

/// Strict `YYYY-MM-DD` coercion: four-digit year, two-digit month and day
fn coerce_iso_date(iso: &str) -> Option<NaiveDate> {
    let mut fields = iso.split('-');
    let (year, month, day) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }

    let all_digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !(all_digits(year, 4) && all_digits(month, 2) && all_digits(day, 2)) {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
