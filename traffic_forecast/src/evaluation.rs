//! Evaluation harness
//!
//! Sends every context window to the oracle in one call, aligns the median
//! forecasts with the held-out observations and scores them.

use crate::error::{ForecastError, Result};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::oracle::{quantile_key, ForecastRequest, Forecaster};
use crate::results::{PredictionResult, ResultsTable};
use crate::split::SplitSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{error, info, warn};

/// Forecast horizon and scored quantile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    /// Steps requested from the oracle; only the first is scored
    pub prediction_length: usize,
    /// Quantile level compared with the ground truth
    pub quantile: f64,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            prediction_length: 1,
            quantile: 0.5,
        }
    }
}

/// Outcome of one evaluation run
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Name of the oracle that produced the forecasts
    pub oracle: String,
    /// One row per sector with both a forecast and ground truth
    pub results: Vec<PredictionResult>,
    /// Aggregate error over `results`
    pub accuracy: ForecastAccuracy,
    /// Forecast sectors with no ground truth, excluded from scoring
    pub orphan_predictions: Vec<String>,
    /// Ground-truth sectors the oracle did not forecast
    pub missing_predictions: Vec<String>,
}

impl EvaluationReport {
    /// Root mean squared error over all scored sectors
    pub fn rmse(&self) -> f64 {
        self.accuracy.rmse
    }
}

/// Scores a [`Forecaster`] against held-out observations
#[derive(Debug, Clone)]
pub struct Evaluator<F> {
    forecaster: F,
    options: EvaluationOptions,
}

impl<F: Forecaster> Evaluator<F> {
    /// Create an evaluator
    pub fn new(forecaster: F, options: EvaluationOptions) -> Result<Self> {
        if options.prediction_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "Prediction length must be positive".to_string(),
            ));
        }
        if !(options.quantile > 0.0 && options.quantile < 1.0) {
            return Err(ForecastError::InvalidParameter(
                "Quantile must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            forecaster,
            options,
        })
    }

    /// Forecast every context and score the forecasts.
    ///
    /// Fails when the oracle fails, when a forecast lacks the scored quantile, or
    /// when no forecast can be aligned with ground truth.
    pub fn run(&self, splits: &SplitSet) -> Result<EvaluationReport> {
        if splits.is_empty() {
            return Err(ForecastError::EvaluationError(
                "No series left to evaluate".to_string(),
            ));
        }

        let quantile_levels = [self.options.quantile];
        let request = ForecastRequest {
            series: &splits.contexts,
            prediction_length: self.options.prediction_length,
            quantile_levels: &quantile_levels,
        };

        info!(
            oracle = self.forecaster.name(),
            series = splits.len(),
            "calling forecasting oracle"
        );
        let forecasts = self.forecaster.predict(&request).map_err(|e| {
            error!(oracle = self.forecaster.name(), error = %e, "oracle call failed");
            e
        })?;

        let mut results = Vec::with_capacity(forecasts.len());
        let mut scored = BTreeSet::new();
        let mut orphan_predictions = Vec::new();

        for forecast in &forecasts {
            let Some(truth) = splits.ground_truth.get(&forecast.entity_id) else {
                orphan_predictions.push(forecast.entity_id.clone());
                continue;
            };
            if !scored.insert(forecast.entity_id.as_str()) {
                warn!(entity = %forecast.entity_id, "duplicate forecast ignored");
                continue;
            }

            let predicted = forecast.point(self.options.quantile).ok_or_else(|| {
                ForecastError::OracleError(format!(
                    "Forecast for '{}' has no value for quantile {}",
                    forecast.entity_id,
                    quantile_key(self.options.quantile)
                ))
            })?;

            results.push(PredictionResult {
                entity_id: forecast.entity_id.clone(),
                actual: truth.traffic,
                predicted,
            });
        }

        let missing_predictions: Vec<String> = splits
            .ground_truth
            .keys()
            .filter(|id| !scored.contains(id.as_str()))
            .cloned()
            .collect();

        if !orphan_predictions.is_empty() {
            warn!(
                count = orphan_predictions.len(),
                "oracle returned forecasts for sectors without ground truth"
            );
        }
        if !missing_predictions.is_empty() {
            warn!(
                count = missing_predictions.len(),
                "oracle returned no forecast for some sectors"
            );
        }

        if results.is_empty() {
            return Err(ForecastError::EvaluationError(
                "No forecast could be aligned with ground truth".to_string(),
            ));
        }

        let actual: Vec<f64> = results.iter().map(|r| r.actual).collect();
        let predicted: Vec<f64> = results.iter().map(|r| r.predicted).collect();
        let accuracy = forecast_accuracy(&actual, &predicted)?;

        info!(
            scored = results.len(),
            rmse = accuracy.rmse,
            "evaluation complete"
        );

        Ok(EvaluationReport {
            oracle: self.forecaster.name().to_string(),
            results,
            accuracy,
            orphan_predictions,
            missing_predictions,
        })
    }

    /// Run the evaluation and write the results table.
    ///
    /// Nothing is written when the run fails.
    pub fn run_and_persist<P: AsRef<Path>>(
        &self,
        splits: &SplitSet,
        output: P,
    ) -> Result<EvaluationReport> {
        let report = self.run(splits)?;
        let mut table = ResultsTable::from_results(&report.results)?;
        table.write_csv(output.as_ref())?;
        info!(path = %output.as_ref().display(), rows = table.len(), "results saved");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeriesPoint;
    use crate::oracle::EntityForecast;
    use crate::split::{ContextWindow, GroundTruthPoint};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    /// Oracle returning canned forecasts
    struct CannedOracle(Vec<EntityForecast>);

    impl Forecaster for CannedOracle {
        fn name(&self) -> &str {
            "canned"
        }

        fn predict(&self, _request: &ForecastRequest<'_>) -> Result<Vec<EntityForecast>> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    impl Forecaster for FailingOracle {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _request: &ForecastRequest<'_>) -> Result<Vec<EntityForecast>> {
            Err(ForecastError::OracleError("connection refused".to_string()))
        }
    }

    fn forecast(entity: &str, key: &str, value: f64) -> EntityForecast {
        EntityForecast {
            entity_id: entity.to_string(),
            quantiles: BTreeMap::from([(key.to_string(), vec![value])]),
        }
    }

    fn splits(truths: &[(&str, f64)]) -> SplitSet {
        let date = NaiveDate::from_ymd_opt(2018, 6, 18).unwrap();
        let mut set = SplitSet::default();
        for &(entity, traffic) in truths {
            set.contexts.push(ContextWindow {
                entity_id: entity.to_string(),
                points: vec![SeriesPoint {
                    date,
                    traffic,
                    imputed: false,
                }],
            });
            set.ground_truth.insert(
                entity.to_string(),
                GroundTruthPoint {
                    entity_id: entity.to_string(),
                    date,
                    traffic,
                },
            );
        }
        set
    }

    #[test]
    fn test_rmse_over_aligned_pairs() {
        let oracle = CannedOracle(vec![forecast("A1", "0.5", 8.0), forecast("B2", "0.5", 22.0)]);
        let evaluator = Evaluator::new(oracle, EvaluationOptions::default()).unwrap();
        let report = evaluator.run(&splits(&[("A1", 10.0), ("B2", 20.0)])).unwrap();

        assert_eq!(report.results.len(), 2);
        assert_relative_eq!(report.rmse(), 2.0);
        assert!(report.orphan_predictions.is_empty());
        assert!(report.missing_predictions.is_empty());
    }

    #[test]
    fn test_orphan_predictions_excluded() {
        let oracle = CannedOracle(vec![forecast("A1", "0.5", 8.0), forecast("GHOST", "0.5", 1.0)]);
        let evaluator = Evaluator::new(oracle, EvaluationOptions::default()).unwrap();
        let report = evaluator.run(&splits(&[("A1", 10.0), ("B2", 20.0)])).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].entity_id, "A1");
        assert_eq!(report.orphan_predictions, vec!["GHOST".to_string()]);
        assert_eq!(report.missing_predictions, vec!["B2".to_string()]);
    }

    #[test]
    fn test_missing_quantile_is_oracle_error() {
        let oracle = CannedOracle(vec![forecast("A1", "0.9", 8.0)]);
        let evaluator = Evaluator::new(oracle, EvaluationOptions::default()).unwrap();
        let result = evaluator.run(&splits(&[("A1", 10.0)]));
        assert!(matches!(result, Err(ForecastError::OracleError(_))));
    }

    #[test]
    fn test_nothing_aligned_is_evaluation_error() {
        let oracle = CannedOracle(vec![forecast("GHOST", "0.5", 8.0)]);
        let evaluator = Evaluator::new(oracle, EvaluationOptions::default()).unwrap();
        let result = evaluator.run(&splits(&[("A1", 10.0)]));
        assert!(matches!(result, Err(ForecastError::EvaluationError(_))));
    }

    #[test]
    fn test_empty_split_set() {
        let evaluator = Evaluator::new(CannedOracle(vec![]), EvaluationOptions::default()).unwrap();
        assert!(matches!(
            evaluator.run(&SplitSet::default()),
            Err(ForecastError::EvaluationError(_))
        ));
    }

    #[test]
    fn test_oracle_failure_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("prediction_results.csv");
        let evaluator = Evaluator::new(FailingOracle, EvaluationOptions::default()).unwrap();

        let result = evaluator.run_and_persist(&splits(&[("A1", 10.0)]), &output);
        assert!(matches!(result, Err(ForecastError::OracleError(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_options() {
        let options = EvaluationOptions {
            quantile: 1.5,
            ..EvaluationOptions::default()
        };
        assert!(Evaluator::new(FailingOracle, options).is_err());

        let options = EvaluationOptions {
            prediction_length: 0,
            ..EvaluationOptions::default()
        };
        assert!(Evaluator::new(FailingOracle, options).is_err());
    }
}
