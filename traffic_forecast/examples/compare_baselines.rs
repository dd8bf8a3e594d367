use chrono::{Days, NaiveDate};
use traffic_forecast::evaluation::{EvaluationOptions, Evaluator};
use traffic_forecast::models::exponential_smoothing::ExponentialSmoothing;
use traffic_forecast::models::moving_average::SimpleMA;
use traffic_forecast::oracle::LocalForecaster;
use traffic_forecast::pipeline::prepare_points;
use traffic_forecast::RegularizeOptions;
use traffic_ingest::{IngestStats, ObservedPoint};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Twenty weeks of synthetic traffic for three sectors, every third week missing
    let start = NaiveDate::from_ymd_opt(2018, 6, 18).ok_or("bad start date")?;
    let mut points = Vec::new();
    for (s, sector) in ["S01", "S02", "S03"].iter().enumerate() {
        for week in (0..20u64).filter(|w| w % 3 != 2) {
            points.push(ObservedPoint::new(
                *sector,
                start + Days::new(7 * week),
                100.0 * (s + 1) as f64 + 2.5 * week as f64 + (week % 4) as f64,
            ));
        }
    }

    let prepared = prepare_points(points, IngestStats::default(), &RegularizeOptions::default())?;
    println!("Prepared {} sectors", prepared.series.len());

    let smoothing = Evaluator::new(
        LocalForecaster::new(ExponentialSmoothing::new(0.6)?),
        EvaluationOptions::default(),
    )?
    .run(&prepared.splits)?;
    let moving_average = Evaluator::new(
        LocalForecaster::new(SimpleMA::new(4)?),
        EvaluationOptions::default(),
    )?
    .run(&prepared.splits)?;

    for report in [&smoothing, &moving_average] {
        println!("{}: RMSE {:.3}", report.oracle, report.rmse());
        for result in &report.results {
            println!(
                "  {}  actual {:.2}  predicted {:.2}",
                result.entity_id, result.actual, result.predicted
            );
        }
    }

    Ok(())
}
