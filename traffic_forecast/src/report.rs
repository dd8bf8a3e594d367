//! Post-hoc report on a results table
//!
//! Summarizes the forecast errors and recalls the recent history of the
//! highest-traffic sectors.

use crate::error::{ForecastError, Result};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::results::PredictionResult;
use chrono::NaiveDate;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::HashMap;
use std::fmt;
use traffic_ingest::ObservedPoint;

/// Distribution of `actual - predicted`
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSummary {
    pub mean: f64,
    /// Sample standard deviation, NaN with a single result
    pub std_dev: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl ErrorSummary {
    fn from_errors(errors: &[f64]) -> Self {
        Self {
            mean: errors.mean(),
            std_dev: errors.std_dev(),
            min: Statistics::min(errors),
            median: Data::new(errors.to_vec()).median(),
            max: Statistics::max(errors),
        }
    }
}

/// Forecast and recent observations of one sector
#[derive(Debug, Clone, PartialEq)]
pub struct SectorHistory {
    pub entity_id: String,
    pub actual: f64,
    pub predicted: f64,
    /// Last raw observations, oldest first
    pub history: Vec<(NaiveDate, f64)>,
}

/// Error statistics plus the top sectors by held-out traffic
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub accuracy: ForecastAccuracy,
    pub errors: ErrorSummary,
    pub sectors: Vec<SectorHistory>,
}

/// Build a report from scored rows and the raw observations they came from.
///
/// `top` sectors with the largest actual traffic are listed, each with its last
/// `tail` observations.
pub fn build_report(
    results: &[PredictionResult],
    observations: &[ObservedPoint],
    top: usize,
    tail: usize,
) -> Result<Report> {
    if results.is_empty() {
        return Err(ForecastError::DataError(
            "Results table is empty".to_string(),
        ));
    }

    let actual: Vec<f64> = results.iter().map(|r| r.actual).collect();
    let predicted: Vec<f64> = results.iter().map(|r| r.predicted).collect();
    let accuracy = forecast_accuracy(&actual, &predicted)?;
    let errors: Vec<f64> = results.iter().map(PredictionResult::error).collect();

    let mut by_sector: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();
    for point in observations {
        by_sector
            .entry(point.entity_id.as_str())
            .or_default()
            .push((point.date, point.traffic));
    }

    let mut ranked: Vec<&PredictionResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        b.actual
            .total_cmp(&a.actual)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    let sectors = ranked
        .into_iter()
        .take(top)
        .map(|result| {
            let mut history = by_sector
                .get(result.entity_id.as_str())
                .cloned()
                .unwrap_or_default();
            history.sort_by_key(|(date, _)| *date);
            let start = history.len().saturating_sub(tail);
            SectorHistory {
                entity_id: result.entity_id.clone(),
                actual: result.actual,
                predicted: result.predicted,
                history: history.split_off(start),
            }
        })
        .collect();

    Ok(Report {
        accuracy,
        errors: ErrorSummary::from_errors(&errors),
        sectors,
    })
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.accuracy)?;
        writeln!(f)?;
        writeln!(f, "Error distribution (actual - predicted):")?;
        writeln!(f, "  mean:    {:.4}", self.errors.mean)?;
        writeln!(f, "  std dev: {:.4}", self.errors.std_dev)?;
        writeln!(f, "  min:     {:.4}", self.errors.min)?;
        writeln!(f, "  median:  {:.4}", self.errors.median)?;
        writeln!(f, "  max:     {:.4}", self.errors.max)?;

        for sector in &self.sectors {
            writeln!(f)?;
            writeln!(
                f,
                "{}: actual {:.2}, predicted {:.2}",
                sector.entity_id, sector.actual, sector.predicted
            )?;
            for (date, traffic) in &sector.history {
                writeln!(f, "  {}  {:.2}", date, traffic)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Days;

    fn result(entity: &str, actual: f64, predicted: f64) -> PredictionResult {
        PredictionResult {
            entity_id: entity.to_string(),
            actual,
            predicted,
        }
    }

    fn observations(entity: &str, values: &[f64]) -> Vec<ObservedPoint> {
        let start = NaiveDate::from_ymd_opt(2018, 6, 18).unwrap();
        values
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &traffic)| ObservedPoint::new(entity, start + Days::new(7 * i as u64), traffic))
            .collect()
    }

    #[test]
    fn test_error_statistics() {
        let results = [result("A1", 10.0, 8.0), result("B2", 20.0, 22.0), result("C3", 5.0, 5.0)];
        let report = build_report(&results, &[], 3, 2).unwrap();

        assert_relative_eq!(report.errors.mean, 0.0);
        assert_relative_eq!(report.errors.min, -2.0);
        assert_relative_eq!(report.errors.median, 0.0);
        assert_relative_eq!(report.errors.max, 2.0);
        assert_relative_eq!(report.errors.std_dev, 2.0);
        assert_eq!(report.accuracy.count, 3);
    }

    #[test]
    fn test_top_sectors_with_tail() {
        let results = [result("A1", 10.0, 8.0), result("B2", 20.0, 22.0), result("C3", 5.0, 5.0)];
        let mut raw = observations("B2", &[1.0, 2.0, 3.0, 4.0]);
        raw.extend(observations("A1", &[7.0]));

        let report = build_report(&results, &raw, 2, 3).unwrap();

        assert_eq!(report.sectors.len(), 2);
        assert_eq!(report.sectors[0].entity_id, "B2");
        let values: Vec<f64> = report.sectors[0].history.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(report.sectors[1].entity_id, "A1");
        assert_eq!(report.sectors[1].history.len(), 1);
    }

    #[test]
    fn test_empty_results_rejected() {
        assert!(matches!(
            build_report(&[], &[], 5, 5),
            Err(ForecastError::DataError(_))
        ));
    }
}
