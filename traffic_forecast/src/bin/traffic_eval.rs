//! Command line front end: evaluate, inspect and report

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use traffic_forecast::config::{EvalConfig, OracleConfig, DEFAULT_ENDPOINT};
use traffic_forecast::error::Result;
use traffic_forecast::inspect::DataSummary;
use traffic_forecast::pipeline::run_evaluation;
use traffic_forecast::report::build_report;
use traffic_forecast::ResultsTable;
use traffic_ingest::{load_file, IngestOptions};

#[derive(Debug, Parser)]
#[command(name = "traffic-eval", version, about = "Backtest sector traffic forecasts")]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info", env = "TRAFFIC_EVAL_LOG")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Forecast the last week of every sector and score it
    Evaluate(EvaluateArgs),
    /// Summarize a raw export
    Inspect(InspectArgs),
    /// Describe the errors of a results table
    Report(ReportArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OracleKind {
    Http,
    ExpSmoothing,
    MovingAverage,
}

#[derive(Debug, Args)]
struct EvaluateArgs {
    /// Raw export, overrides `input_path` from the config file
    #[arg(long)]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Results table, overrides `output_path` from the config file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Forecaster to evaluate
    #[arg(long, value_enum)]
    oracle: Option<OracleKind>,

    /// Model server endpoint for the http oracle
    #[arg(long, env = "TRAFFIC_EVAL_ENDPOINT")]
    endpoint: Option<String>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Raw export
    #[arg(long)]
    input: PathBuf,

    /// TOML configuration file, for its `[ingest]` section
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Results table written by `evaluate`
    #[arg(long)]
    results: PathBuf,

    /// Raw export the results came from
    #[arg(long)]
    input: PathBuf,

    /// TOML configuration file, for its `[ingest]` section
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sectors to list, by actual traffic
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Observations shown per listed sector
    #[arg(long, default_value_t = 10)]
    tail: usize,
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "traffic_eval={level},traffic_forecast={level},traffic_ingest={level}"
        ))
    });

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EvalConfig> {
    match path {
        Some(path) => EvalConfig::load_from_path(path),
        None => Ok(EvalConfig::default()),
    }
}

fn ingest_options(path: Option<&PathBuf>) -> Result<IngestOptions> {
    Ok(load_config(path)?.ingest)
}

/// Apply `--oracle` and `--endpoint` on top of the configured oracle
fn select_oracle(
    configured: OracleConfig,
    kind: Option<OracleKind>,
    endpoint: Option<String>,
) -> OracleConfig {
    let oracle = match (kind, configured) {
        (None, configured) => configured,
        (Some(OracleKind::Http), http @ OracleConfig::Http { .. }) => http,
        (Some(OracleKind::ExpSmoothing), es @ OracleConfig::ExpSmoothing { .. }) => es,
        (Some(OracleKind::MovingAverage), ma @ OracleConfig::MovingAverage { .. }) => ma,
        (Some(OracleKind::Http), _) => OracleConfig::Http {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: None,
        },
        (Some(OracleKind::ExpSmoothing), _) => OracleConfig::ExpSmoothing { alpha: 0.5 },
        (Some(OracleKind::MovingAverage), _) => OracleConfig::MovingAverage { window: 4 },
    };

    match (oracle, endpoint) {
        (OracleConfig::Http { timeout_secs, .. }, Some(endpoint)) => OracleConfig::Http {
            endpoint,
            timeout_secs,
        },
        (oracle, _) => oracle,
    }
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(input) = args.input {
        config.input_path = Some(input);
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    config.oracle = select_oracle(config.oracle, args.oracle, args.endpoint);
    config.validate()?;

    let forecaster = config.oracle.build()?;
    let (prepared, report) = run_evaluation(&config, forecaster)?;

    info!(
        sectors = prepared.series.len(),
        short = prepared.regularize_stats.short_entities.len(),
        output = %config.output_path.display(),
        "evaluation finished"
    );

    println!("Oracle: {}", report.oracle);
    println!(
        "Sectors evaluated: {} ({} too short, {} without forecast, {} orphan forecasts)",
        report.results.len(),
        prepared.regularize_stats.short_entities.len(),
        report.missing_predictions.len(),
        report.orphan_predictions.len()
    );
    print!("{}", report.accuracy);
    println!("Results written to {}", config.output_path.display());
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let options = ingest_options(args.config.as_ref())?;
    let table = load_file(&args.input, &options)?;
    print!("{}", DataSummary::from_table(&table));
    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let options = ingest_options(args.config.as_ref())?;
    let results = ResultsTable::read_csv(&args.results)?.to_results()?;
    let table = load_file(&args.input, &options)?;
    let report = build_report(&results, &table.points, args.top, args.tail)?;
    print!("{}", report);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);

    let outcome = match cli.command {
        Command::Evaluate(args) => evaluate(args),
        Command::Inspect(args) => inspect(args),
        Command::Report(args) => report(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_endpoint_overrides_configured_http() {
        let oracle = select_oracle(
            OracleConfig::Http {
                endpoint: "http://a/predict".to_string(),
                timeout_secs: Some(5),
            },
            None,
            Some("http://b/predict".to_string()),
        );
        assert_eq!(
            oracle,
            OracleConfig::Http {
                endpoint: "http://b/predict".to_string(),
                timeout_secs: Some(5),
            }
        );
    }

    #[test]
    fn test_oracle_kind_keeps_matching_parameters() {
        let oracle = select_oracle(
            OracleConfig::MovingAverage { window: 8 },
            Some(OracleKind::MovingAverage),
            None,
        );
        assert_eq!(oracle, OracleConfig::MovingAverage { window: 8 });

        let oracle = select_oracle(
            OracleConfig::MovingAverage { window: 8 },
            Some(OracleKind::ExpSmoothing),
            Some("ignored".to_string()),
        );
        assert_eq!(oracle, OracleConfig::ExpSmoothing { alpha: 0.5 });
    }
}
