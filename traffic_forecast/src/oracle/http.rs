//! Remote model server over JSON/HTTP
//!
//! Request body:
//!
//! ```json
//! {"prediction_length": 1, "quantile_levels": [0.5],
//!  "series": [{"id": "A1", "timestamps": ["2018-06-18"], "target": [12.5]}]}
//! ```
//!
//! Response body:
//!
//! ```json
//! {"predictions": [{"id": "A1", "quantiles": {"0.5": [13.1]}}]}
//! ```

use crate::error::{ForecastError, Result};
use crate::oracle::{EntityForecast, ForecastRequest, Forecaster};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Serialize)]
pub(crate) struct PredictPayload<'a> {
    prediction_length: usize,
    quantile_levels: &'a [f64],
    series: Vec<SeriesPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    id: &'a str,
    timestamps: Vec<String>,
    target: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictResponse {
    predictions: Vec<PredictionPayload>,
}

#[derive(Debug, Deserialize)]
struct PredictionPayload {
    id: String,
    quantiles: BTreeMap<String, Vec<f64>>,
}

impl<'a> PredictPayload<'a> {
    fn from_request(request: &ForecastRequest<'a>) -> Self {
        let series = request
            .series
            .iter()
            .map(|context| SeriesPayload {
                id: &context.entity_id,
                timestamps: context
                    .dates()
                    .iter()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .collect(),
                target: context.values(),
            })
            .collect();

        Self {
            prediction_length: request.prediction_length,
            quantile_levels: request.quantile_levels,
            series,
        }
    }
}

/// Forecaster calling a model server endpoint
#[derive(Debug, Clone)]
pub struct HttpForecaster {
    client: Client,
    endpoint: String,
}

impl HttpForecaster {
    /// Create a client for `endpoint`. `None` means the call may block indefinitely.
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Get the endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Forecaster for HttpForecaster {
    fn name(&self) -> &str {
        "http"
    }

    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Vec<EntityForecast>> {
        let payload = PredictPayload::from_request(request);
        info!(
            endpoint = %self.endpoint,
            series = payload.series.len(),
            "requesting forecasts"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .map_err(|e| {
                ForecastError::OracleError(format!("request to {} failed: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ForecastError::OracleError(format!(
                "{} returned {}: {}",
                self.endpoint, status, body
            )));
        }

        let body: PredictResponse = response
            .json()
            .map_err(|e| ForecastError::OracleError(format!("malformed oracle response: {}", e)))?;

        Ok(body
            .predictions
            .into_iter()
            .map(|p| EntityForecast {
                entity_id: p.id,
                quantiles: p.quantiles,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeriesPoint;
    use crate::split::ContextWindow;
    use chrono::NaiveDate;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn context() -> ContextWindow {
        ContextWindow {
            entity_id: "A1".to_string(),
            points: vec![
                SeriesPoint {
                    date: NaiveDate::from_ymd_opt(2018, 6, 18).unwrap(),
                    traffic: 10.0,
                    imputed: false,
                },
                SeriesPoint {
                    date: NaiveDate::from_ymd_opt(2018, 6, 25).unwrap(),
                    traffic: 11.5,
                    imputed: true,
                },
            ],
        }
    }

    /// Serve one request with `body`, returning the raw request text
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/predict", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_payload_shape() {
        let series = vec![context()];
        let request = ForecastRequest {
            series: &series,
            prediction_length: 1,
            quantile_levels: &[0.5],
        };
        let json = serde_json::to_value(PredictPayload::from_request(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prediction_length": 1,
                "quantile_levels": [0.5],
                "series": [{
                    "id": "A1",
                    "timestamps": ["2018-06-18", "2018-06-25"],
                    "target": [10.0, 11.5]
                }]
            })
        );
    }

    #[test]
    fn test_predict_round_trip() {
        let (url, handle) = serve_once(
            "200 OK",
            r#"{"predictions": [{"id": "A1", "quantiles": {"0.5": [12.25]}}]}"#,
        );
        let forecaster = HttpForecaster::new(url, Some(Duration::from_secs(10))).unwrap();
        let series = vec![context()];
        let request = ForecastRequest {
            series: &series,
            prediction_length: 1,
            quantile_levels: &[0.5],
        };

        let forecasts = forecaster.predict(&request).unwrap();
        let raw_request = handle.join().unwrap();

        assert!(raw_request.starts_with("POST /predict"));
        assert!(raw_request.contains("\"target\":[10.0,11.5]"));
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].point(0.5), Some(12.25));
    }

    #[test]
    fn test_server_error_is_oracle_error() {
        let (url, handle) = serve_once("500 Internal Server Error", r#"{"detail": "model not loaded"}"#);
        let forecaster = HttpForecaster::new(url, Some(Duration::from_secs(10))).unwrap();
        let series = vec![context()];
        let request = ForecastRequest {
            series: &series,
            prediction_length: 1,
            quantile_levels: &[0.5],
        };

        let result = forecaster.predict(&request);
        handle.join().unwrap();
        assert!(matches!(result, Err(ForecastError::OracleError(msg)) if msg.contains("500")));
    }

    #[test]
    fn test_unreachable_endpoint_is_oracle_error() {
        // Bind then drop to get a port with nothing listening
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let forecaster =
            HttpForecaster::new(format!("http://127.0.0.1:{}/predict", port), None).unwrap();
        let series = vec![context()];
        let request = ForecastRequest {
            series: &series,
            prediction_length: 1,
            quantile_levels: &[0.5],
        };
        assert!(matches!(
            forecaster.predict(&request),
            Err(ForecastError::OracleError(_))
        ));
    }
}
