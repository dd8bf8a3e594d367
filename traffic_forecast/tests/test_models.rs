use approx::assert_relative_eq;
use rstest::rstest;
use traffic_forecast::models::exponential_smoothing::ExponentialSmoothing;
use traffic_forecast::models::moving_average::SimpleMA;
use traffic_forecast::models::{ForecastModel, TrainedForecastModel};

fn weekly_traffic() -> Vec<f64> {
    vec![100.0, 102.0, 104.0, 103.0, 105.0]
}

#[test]
fn test_exponential_smoothing() {
    let model = ExponentialSmoothing::new(0.7).unwrap();
    let trained = model.train(&weekly_traffic()).unwrap();

    let forecast = trained.forecast(3).unwrap();
    assert_eq!(forecast.horizons(), 3);
    assert_eq!(forecast.values().len(), 3);

    // Flat forecast within the observed range
    let first = forecast.values()[0];
    assert!(first > 100.0 && first < 105.0);
    assert!(forecast.values().iter().all(|&v| v == first));
}

#[test]
fn test_moving_average() {
    let model = SimpleMA::new(3).unwrap();
    let trained = model.train(&weekly_traffic()).unwrap();

    let forecast = trained.forecast(1).unwrap();
    assert_relative_eq!(forecast.values()[0], (104.0 + 103.0 + 105.0) / 3.0);
}

#[test]
fn test_moving_average_needs_full_window() {
    let model = SimpleMA::new(10).unwrap();
    assert!(model.train(&weekly_traffic()).is_err());
}

#[rstest]
#[case(0.1)]
#[case(0.5)]
#[case(0.9)]
fn test_constant_series_forecasts_constant(#[case] alpha: f64) {
    let model = ExponentialSmoothing::new(alpha).unwrap();
    let trained = model.train(&[42.0; 14]).unwrap();
    assert_relative_eq!(trained.forecast(1).unwrap().values()[0], 42.0);
}

#[rstest]
#[case(-0.5)]
#[case(0.0)]
#[case(1.0)]
fn test_invalid_alpha(#[case] alpha: f64) {
    assert!(ExponentialSmoothing::new(alpha).is_err());
}

#[test]
fn test_model_names() {
    assert_eq!(
        ExponentialSmoothing::new(0.5).unwrap().name(),
        "Exponential Smoothing (alpha=0.5)"
    );
    assert_eq!(SimpleMA::new(4).unwrap().name(), "Simple Moving Average (window=4)");
}
