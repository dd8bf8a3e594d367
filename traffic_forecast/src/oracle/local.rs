//! Oracle backed by a local baseline model

use crate::error::Result;
use crate::models::{ForecastModel, TrainedForecastModel};
use crate::oracle::{quantile_key, EntityForecast, ForecastRequest, Forecaster};
use tracing::debug;

/// Trains `M` on every context and reports its point forecast for each
/// requested quantile level
#[derive(Debug, Clone)]
pub struct LocalForecaster<M> {
    model: M,
}

impl<M: ForecastModel> LocalForecaster<M> {
    /// Wrap a model
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: ForecastModel> Forecaster for LocalForecaster<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Vec<EntityForecast>> {
        request
            .series
            .iter()
            .map(|context| -> Result<EntityForecast> {
                let trained = self.model.train(&context.values())?;
                let values = trained.forecast(request.prediction_length)?.into_values();
                debug!(entity = %context.entity_id, model = trained.name(), "local forecast");

                let quantiles = request
                    .quantile_levels
                    .iter()
                    .map(|&level| (quantile_key(level), values.clone()))
                    .collect();

                Ok(EntityForecast {
                    entity_id: context.entity_id.clone(),
                    quantiles,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeriesPoint;
    use crate::models::moving_average::SimpleMA;
    use crate::split::ContextWindow;
    use chrono::{Days, NaiveDate};

    fn context(entity: &str, values: &[f64]) -> ContextWindow {
        let start = NaiveDate::from_ymd_opt(2018, 6, 18).unwrap();
        ContextWindow {
            entity_id: entity.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, &traffic)| SeriesPoint {
                    date: start + Days::new(7 * i as u64),
                    traffic,
                    imputed: false,
                })
                .collect(),
        }
    }

    #[test]
    fn test_local_forecaster_fills_every_quantile() {
        let forecaster = LocalForecaster::new(SimpleMA::new(2).unwrap());
        let series = vec![context("A1", &[1.0, 3.0, 5.0]), context("B2", &[2.0, 2.0])];
        let request = ForecastRequest {
            series: &series,
            prediction_length: 1,
            quantile_levels: &[0.1, 0.5],
        };

        let forecasts = forecaster.predict(&request).unwrap();
        assert_eq!(forecasts.len(), 2);
        assert_eq!(forecasts[0].point(0.5), Some(4.0));
        assert_eq!(forecasts[0].point(0.1), Some(4.0));
        assert_eq!(forecasts[1].entity_id, "B2");
    }

    #[test]
    fn test_local_forecaster_propagates_model_errors() {
        let forecaster = LocalForecaster::new(SimpleMA::new(5).unwrap());
        let series = vec![context("A1", &[1.0])];
        let request = ForecastRequest {
            series: &series,
            prediction_length: 1,
            quantile_levels: &[0.5],
        };
        assert!(forecaster.predict(&request).is_err());
    }
}
