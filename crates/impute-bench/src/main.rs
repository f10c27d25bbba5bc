//! CLI entry point for the imputation benchmark.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use impute_bench::{
    AutoAdvance, BenchmarkConfig, BenchmarkReport, BenchmarkRunner, FillStatistic, ScoringPolicy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// CLI-compatible fill statistic enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStatistic {
    /// Mean of observed values
    Mean,
    /// Median of observed values
    Median,
    /// Most frequent observed value
    MostFrequent,
}

impl From<CliStatistic> for FillStatistic {
    fn from(cli: CliStatistic) -> Self {
        match cli {
            CliStatistic::Mean => FillStatistic::Mean,
            CliStatistic::Median => FillStatistic::Median,
            CliStatistic::MostFrequent => FillStatistic::MostFrequent,
        }
    }
}

/// CLI-compatible scoring policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliScoring {
    /// Score only the cells that were nulled
    Injected,
    /// Score every cell present in both tables
    Observed,
}

impl From<CliScoring> for ScoringPolicy {
    fn from(cli: CliScoring) -> Self {
        match cli {
            CliScoring::Injected => ScoringPolicy::InjectedCells,
            CliScoring::Observed => ScoringPolicy::ObservedCells,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Missing-value imputation benchmark",
    long_about = "Injects missing values into complete datasets, imputes them with several \
                  strategies and reports MAE / RMSE per column.\n\n\
                  EXAMPLES:\n  \
                  # Default matrix, datasets in ./data\n  \
                  impute-bench --data-dir data\n\n  \
                  # Unattended run with a JSON report\n  \
                  impute-bench --data-dir data --no-pause -r -o results/\n\n  \
                  # Custom configuration, JSON on stdout\n  \
                  impute-bench -c bench.json --json | jq '.datasets[0].scenarios'"
)]
struct Args {
    /// JSON configuration file (datasets, scenarios, strategy settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory relative dataset paths are resolved against
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Seed for injection and seeded strategies (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Statistic for the univariate strategy (overrides the config)
    #[arg(long, value_enum)]
    statistic: Option<CliStatistic>,

    /// Cells included in MAE / RMSE (overrides the config)
    #[arg(long, value_enum)]
    scoring: Option<CliScoring>,

    /// Do not wait for Enter between scenarios
    #[arg(long)]
    no_pause: bool,

    /// Output directory for the report
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// Write benchmark_report.json to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Output JSON to stdout instead of the human-readable results
    ///
    /// Disables all logs and the pause between scenarios.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors in the log
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;
    let runner = build_runner(&args, config)?;

    let report = match runner.run() {
        Ok(report) => report,
        Err(e) => {
            error!("Benchmark failed: {}", e);
            return Err(anyhow!("Benchmark failed: {}", e));
        }
    };

    handle_output(&report, &args)
}

/// Load the configuration file (or defaults) and apply CLI overrides.
fn build_config(args: &Args) -> Result<BenchmarkConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            info!("Loading configuration from: {}", path.display());
            BenchmarkConfig::from_json_file(path)?
        }
        None => BenchmarkConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(statistic) = args.statistic {
        config.statistic = statistic.into();
    }
    if let Some(scoring) = args.scoring {
        config.scoring = scoring.into();
    }
    if args.no_pause || args.json {
        config.pause_between_scenarios = false;
    }

    config.validate()?;
    Ok(config)
}

fn build_runner(args: &Args, config: BenchmarkConfig) -> Result<BenchmarkRunner> {
    if let Some(dir) = &args.data_dir
        && !dir.is_dir()
    {
        warn!("Data directory not found: {}", dir.display());
    }

    let mut builder = BenchmarkRunner::builder()
        .print_scenarios(!args.json)
        .config(config);

    if let Some(dir) = &args.data_dir {
        builder = builder.data_dir(dir);
    }

    if args.json {
        builder = builder.gate(Arc::new(AutoAdvance));
    }

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Handle benchmark output based on CLI flags.
///
/// Output behavior:
/// - Default: scenario results were already printed as they finished
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_output(report: &BenchmarkReport, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for (dataset, scenario) in report.failed_scenarios() {
            if let Some(err) = &scenario.error {
                warn!(
                    "{} scenario {} failed: {}",
                    dataset.name, scenario.index, err.message
                );
            }
        }
        info!(
            "{} scenarios completed{}",
            report.completed_scenarios(),
            if report.stopped_early { ", stopped early" } else { "" }
        );
    }

    if args.emit_report {
        let path = report.write_to_dir(Path::new(&args.output))?;
        if !args.json {
            info!("Report written to {}", path.display());
        }
    }

    Ok(())
}
