//! Per-sector series construction and weekly regularization

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use traffic_ingest::ObservedPoint;

/// One grid point of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Grid date
    pub date: NaiveDate,
    /// Traffic in Mbps
    pub traffic: f64,
    /// True when the grid point had no observation and was filled
    pub imputed: bool,
}

/// Time series of one sector, strictly ascending by date
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Sector identifier
    entity_id: String,
    /// Points sorted by date, one per date
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Create a series, checking ordering and values
    pub fn new(entity_id: impl Into<String>, points: Vec<SeriesPoint>) -> Result<Self> {
        let entity_id = entity_id.into();

        if let Some(pair) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::DataError(format!(
                "Series '{}' is not strictly ascending at {}",
                entity_id, pair[1].date
            )));
        }

        if let Some(point) = points.iter().find(|p| !p.traffic.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Series '{}' has a non-finite value at {}",
                entity_id, point.date
            )));
        }

        Ok(Self { entity_id, points })
    }

    /// Get the sector identifier
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Get the points
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Get the dates as a vector
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Get the traffic values as a vector
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.traffic).collect()
    }

    /// Last point by date
    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Number of grid points that were filled
    pub fn imputed_count(&self) -> usize {
        self.points.iter().filter(|p| p.imputed).count()
    }

    /// Whether consecutive dates are exactly `step_days` apart
    pub fn is_regular(&self, step_days: u64) -> bool {
        self.points
            .windows(2)
            .all(|w| (w[1].date - w[0].date).num_days() == step_days as i64)
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// Grid and eligibility settings for regularization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizeOptions {
    /// Days between grid points
    pub step_days: u64,
    /// Minimum distinct observation dates for a sector to be kept
    pub min_observations: usize,
}

impl Default for RegularizeOptions {
    fn default() -> Self {
        Self {
            step_days: 7,
            min_observations: 10,
        }
    }
}

/// Counters describing what regularization removed or filled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegularizeStats {
    /// Distinct sectors in the input
    pub entities_seen: usize,
    /// Sectors dropped for having too few distinct dates
    pub short_entities: Vec<String>,
    /// Observations replaced by a later one on the same date
    pub duplicate_dates: usize,
    /// Observations falling between grid dates
    pub off_grid: usize,
    /// Grid points filled by interpolation or padding
    pub imputed: usize,
    /// Sectors whose regularized series could not be built
    pub failed_entities: Vec<String>,
}

/// Fill missing values on an evenly spaced grid.
///
/// Gaps are linearly interpolated between the nearest known neighbours. Values
/// before the first or after the last known point are padded forward, then
/// backward. Returns `None` when no value is known.
pub fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    if known.is_empty() {
        return None;
    }

    let value_at = |i: usize| values[i].unwrap_or(f64::NAN);
    let filled = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            if let Some(v) = value {
                return *v;
            }
            let next = known.partition_point(|&k| k < i);
            let prev = next.checked_sub(1).map(|p| known[p]);
            let next = known.get(next).copied();
            match (prev, next) {
                (Some(p), Some(n)) => {
                    let weight = (i - p) as f64 / (n - p) as f64;
                    value_at(p) * (1.0 - weight) + value_at(n) * weight
                }
                (Some(p), None) => value_at(p),
                (None, Some(n)) => value_at(n),
                (None, None) => f64::NAN,
            }
        })
        .collect();

    Some(filled)
}

/// Build one dense series from deduplicated observations
fn regularize_entity(
    entity_id: &str,
    observations: &BTreeMap<NaiveDate, f64>,
    step_days: u64,
    stats: &mut RegularizeStats,
) -> Result<Option<Series>> {
    let (Some((&first, _)), Some((&last, _))) =
        (observations.first_key_value(), observations.last_key_value())
    else {
        return Ok(None);
    };

    let mut grid = Vec::new();
    let mut current = first;
    while current <= last {
        grid.push(current);
        match current.checked_add_days(Days::new(step_days)) {
            Some(next) => current = next,
            None => break,
        }
    }

    let raw: Vec<Option<f64>> = grid.iter().map(|d| observations.get(d).copied()).collect();
    let on_grid = raw.iter().flatten().count();
    stats.off_grid += observations.len() - on_grid;

    let Some(values) = fill_gaps(&raw) else {
        return Ok(None);
    };

    let points: Vec<SeriesPoint> = grid
        .into_iter()
        .zip(raw.iter().zip(values))
        .map(|(date, (original, traffic))| SeriesPoint {
            date,
            traffic,
            imputed: original.is_none(),
        })
        .collect();

    let series = Series::new(entity_id, points)?;
    stats.imputed += series.imputed_count();
    Ok(Some(series))
}

/// Group observations by sector and resample each onto a fixed-step grid.
///
/// Duplicate dates keep the last observation in input order. Sectors with fewer
/// than `min_observations` distinct dates are dropped. Output is ordered by
/// sector id.
pub fn regularize(
    points: &[ObservedPoint],
    options: &RegularizeOptions,
) -> Result<(Vec<Series>, RegularizeStats)> {
    if options.step_days == 0 {
        return Err(ForecastError::InvalidParameter(
            "Grid step must be at least one day".to_string(),
        ));
    }

    let mut stats = RegularizeStats::default();
    let mut groups: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for point in points {
        let group = groups.entry(point.entity_id.as_str()).or_default();
        if group.insert(point.date, point.traffic).is_some() {
            stats.duplicate_dates += 1;
        }
    }
    stats.entities_seen = groups.len();

    let mut series = Vec::with_capacity(groups.len());
    for (entity_id, observations) in &groups {
        if observations.len() < options.min_observations {
            debug!(
                entity = %entity_id,
                observations = observations.len(),
                "dropping short series"
            );
            stats.short_entities.push(entity_id.to_string());
            continue;
        }

        match regularize_entity(entity_id, observations, options.step_days, &mut stats) {
            Ok(Some(regular)) => series.push(regular),
            Ok(None) => {}
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "skipping sector");
                stats.failed_entities.push(entity_id.to_string());
            }
        }
    }

    info!(
        entities = stats.entities_seen,
        kept = series.len(),
        short = stats.short_entities.len(),
        failed = stats.failed_entities.len(),
        duplicates = stats.duplicate_dates,
        off_grid = stats.off_grid,
        imputed = stats.imputed,
        "regularized series"
    );

    Ok((series, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn observation(entity: &str, date: NaiveDate, traffic: f64) -> ObservedPoint {
        ObservedPoint::new(entity, date, traffic)
    }

    fn weekly(entity: &str, start: NaiveDate, weeks: &[u64], value: impl Fn(u64) -> f64) -> Vec<ObservedPoint> {
        weeks
            .iter()
            .map(|&w| observation(entity, start + Days::new(7 * w), value(w)))
            .collect()
    }

    #[test]
    fn test_fill_gaps_interpolates_and_pads() {
        let values = [None, Some(1.0), None, None, Some(4.0), None];
        assert_eq!(
            fill_gaps(&values).unwrap(),
            vec![1.0, 1.0, 2.0, 3.0, 4.0, 4.0]
        );
    }

    #[test]
    fn test_fill_gaps_all_missing() {
        assert_eq!(fill_gaps(&[None, None]), None);
        assert_eq!(fill_gaps(&[]), None);
    }

    #[test]
    fn test_regularize_fills_missing_week() {
        let start = date(2018, 6, 18);
        let weeks: Vec<u64> = (0..12).filter(|w| *w != 4).collect();
        let points = weekly("A1", start, &weeks, |w| w as f64 * 10.0);

        let (series, stats) = regularize(&points, &RegularizeOptions::default()).unwrap();
        assert_eq!(series.len(), 1);

        let s = &series[0];
        assert_eq!(s.len(), 12);
        assert!(s.is_regular(7));
        assert_eq!(s.points()[4].traffic, 40.0);
        assert!(s.points()[4].imputed);
        assert_eq!(s.imputed_count(), 1);
        assert_eq!(stats.imputed, 1);
    }

    #[test]
    fn test_duplicate_dates_keep_last() {
        let start = date(2018, 6, 18);
        let weeks: Vec<u64> = (0..10).collect();
        let mut points = weekly("A1", start, &weeks, |_| 1.0);
        points.push(observation("A1", start, 99.0));

        let (series, stats) = regularize(&points, &RegularizeOptions::default()).unwrap();
        assert_eq!(stats.duplicate_dates, 1);
        assert_eq!(series[0].len(), 10);
        assert_eq!(series[0].points()[0].traffic, 99.0);
    }

    #[test]
    fn test_short_series_dropped() {
        let start = date(2018, 6, 18);
        let mut points = weekly("SHORT", start, &(0..9).collect::<Vec<_>>(), |_| 1.0);
        // Duplicates do not count toward the minimum
        points.push(observation("SHORT", start, 2.0));
        points.extend(weekly("LONG", start, &(0..10).collect::<Vec<_>>(), |_| 1.0));

        let (series, stats) = regularize(&points, &RegularizeOptions::default()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].entity_id(), "LONG");
        assert_eq!(stats.short_entities, vec!["SHORT".to_string()]);
        assert_eq!(stats.entities_seen, 2);
    }

    #[test]
    fn test_off_grid_observations_discarded() {
        let start = date(2018, 6, 18);
        let mut points = weekly("A1", start, &(0..10).collect::<Vec<_>>(), |w| w as f64);
        // Wednesday measurement between two Mondays
        points.push(observation("A1", date(2018, 6, 20), 500.0));

        let (series, stats) = regularize(&points, &RegularizeOptions::default()).unwrap();
        assert_eq!(stats.off_grid, 1);
        assert_eq!(series[0].len(), 10);
        assert!(series[0].values().iter().all(|v| *v < 500.0));
    }

    #[test]
    fn test_grid_stops_at_last_step_before_max_date() {
        let start = date(2018, 6, 18);
        let mut points = weekly("A1", start, &(0..10).collect::<Vec<_>>(), |w| w as f64);
        points.push(observation("A1", date(2018, 8, 29), 7.0));

        let (series, _) = regularize(&points, &RegularizeOptions::default()).unwrap();
        let s = &series[0];
        assert_eq!(s.last().unwrap().date, date(2018, 8, 27));
        assert!(s.last().unwrap().date <= date(2018, 8, 29));
    }

    #[test]
    fn test_output_ordered_by_entity() {
        let start = date(2018, 6, 18);
        let weeks: Vec<u64> = (0..10).collect();
        let mut points = weekly("Z9", start, &weeks, |_| 1.0);
        points.extend(weekly("A1", start, &weeks, |_| 2.0));

        let (series, _) = regularize(&points, &RegularizeOptions::default()).unwrap();
        let ids: Vec<&str> = series.iter().map(|s| s.entity_id()).collect();
        assert_eq!(ids, vec!["A1", "Z9"]);
    }

    #[test]
    fn test_fill_gaps_extreme_neighbours_stay_finite() {
        let values = [Some(1.7e308), None, Some(-1.7e308)];
        let filled = fill_gaps(&values).unwrap();
        assert!(filled.iter().all(|v| v.is_finite()));
        assert_eq!(filled[1], 0.0);
    }

    #[test]
    fn test_extreme_sector_does_not_abort_others() {
        let start = date(2018, 6, 18);
        let weeks: Vec<u64> = (0..12).filter(|w| *w != 5).collect();
        let mut points = weekly("BAD", start, &weeks, |w| match w {
            4 => 1.7e308,
            6 => -1.7e308,
            _ => 1.0,
        });
        points.extend(weekly("GOOD", start, &(0..12).collect::<Vec<_>>(), |_| 2.0));

        let (series, stats) = regularize(&points, &RegularizeOptions::default()).unwrap();
        let ids: Vec<&str> = series.iter().map(|s| s.entity_id()).collect();
        assert_eq!(ids, vec!["BAD", "GOOD"]);
        assert!(series[0].values().iter().all(|v| v.is_finite()));
        assert!(stats.failed_entities.is_empty());
    }

    #[test]
    fn test_unbuildable_sector_is_skipped() {
        let start = date(2018, 6, 18);
        let weeks: Vec<u64> = (0..10).collect();
        let mut points = weekly("NAN", start, &weeks, |w| if w == 3 { f64::NAN } else { 1.0 });
        points.extend(weekly("GOOD", start, &weeks, |_| 2.0));

        let (series, stats) = regularize(&points, &RegularizeOptions::default()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].entity_id(), "GOOD");
        assert_eq!(stats.failed_entities, vec!["NAN".to_string()]);
    }

    #[test]
    fn test_zero_step_rejected() {
        let options = RegularizeOptions {
            step_days: 0,
            ..RegularizeOptions::default()
        };
        assert!(regularize(&[], &options).is_err());
    }

    #[test]
    fn test_series_rejects_unsorted_points() {
        let points = vec![
            SeriesPoint {
                date: date(2018, 6, 25),
                traffic: 1.0,
                imputed: false,
            },
            SeriesPoint {
                date: date(2018, 6, 18),
                traffic: 1.0,
                imputed: false,
            },
        ];
        assert!(Series::new("A1", points).is_err());
    }
}
