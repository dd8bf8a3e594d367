//! End-to-end run: ingest, regularize, split, evaluate

use crate::config::EvalConfig;
use crate::data::{regularize, RegularizeOptions, RegularizeStats, Series};
use crate::error::{ForecastError, Result};
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::oracle::Forecaster;
use crate::split::{split_all, SplitSet};
use std::path::Path;
use tracing::info;
use traffic_ingest::{load_file, IngestOptions, IngestStats, ObservedPoint};

/// Evaluation-ready data derived from one export
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Parsed observations, in file order
    pub points: Vec<ObservedPoint>,
    pub ingest_stats: IngestStats,
    /// Dense weekly series, ordered by sector id
    pub series: Vec<Series>,
    pub regularize_stats: RegularizeStats,
    pub splits: SplitSet,
}

/// Regularize observations and hold out the last point of every series
pub fn prepare_points(
    points: Vec<ObservedPoint>,
    ingest_stats: IngestStats,
    options: &RegularizeOptions,
) -> Result<PreparedData> {
    let (series, regularize_stats) = regularize(&points, options)?;
    let splits = split_all(&series);

    info!(
        observations = points.len(),
        series = series.len(),
        short = regularize_stats.short_entities.len(),
        imputed = regularize_stats.imputed,
        "data prepared"
    );

    Ok(PreparedData {
        points,
        ingest_stats,
        series,
        regularize_stats,
        splits,
    })
}

/// Load an export and prepare it for evaluation
pub fn prepare_file<P: AsRef<Path>>(
    path: P,
    ingest: &IngestOptions,
    options: &RegularizeOptions,
) -> Result<PreparedData> {
    let table = load_file(path, ingest)?;
    prepare_points(table.points, table.stats, options)
}

/// Run a full evaluation with the given forecaster, writing the results table
/// to `config.output_path` on success
pub fn run_evaluation<F: Forecaster>(
    config: &EvalConfig,
    forecaster: F,
) -> Result<(PreparedData, EvaluationReport)> {
    let input = config.input_path.as_ref().ok_or_else(|| {
        ForecastError::ConfigError("no input file given".to_string())
    })?;

    let prepared = prepare_file(input, &config.ingest, &config.regularize)?;
    let evaluator = Evaluator::new(forecaster, config.evaluation.clone())?;
    let report = evaluator.run_and_persist(&prepared.splits, &config.output_path)?;

    Ok((prepared, report))
}
