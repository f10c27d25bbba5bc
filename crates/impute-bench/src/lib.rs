//! Missing-Value Imputation Benchmark
//!
//! Removes a controlled, seeded fraction of values from complete tables,
//! fills them back in with competing strategies and scores each
//! reconstruction against the ground truth.
//!
//! # Overview
//!
//! - **Injection**: uniform-random cells or contiguous bursts, reproducible from a seed
//! - **Strategies**: column statistic, iterative ridge regression, soft-thresholded SVD
//! - **Evaluation**: per-column MAE and RMSE over the injected (or all observed) cells
//! - **Orchestration**: the full {dataset x scenario x strategy} matrix with a
//!   pause between scenarios, progress reporting and cancellation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use impute_bench::{AutoAdvance, BenchmarkConfig, BenchmarkRunner};
//! use std::sync::Arc;
//!
//! let config = BenchmarkConfig::builder()
//!     .seed(42)
//!     .pause_between_scenarios(false)
//!     .build()?;
//!
//! let report = BenchmarkRunner::builder()
//!     .config(config)
//!     .data_dir("data")
//!     .build()?
//!     .run()?;
//!
//! print!("{}", impute_bench::reporting::text::render_report(&report));
//! ```
//!
//! # Single Components
//!
//! Every stage can be used on its own:
//!
//! ```rust,ignore
//! use impute_bench::*;
//!
//! let columns = vec!["temp_max".to_string(), "wind".to_string()];
//! let gapped = MissingValueInjector::default().inject(
//!     &df,
//!     &columns,
//!     PercentRange::new(10.0, 15.0),
//!     42,
//!     MissingMechanism::Burst,
//! )?;
//!
//! let outcome = SoftImputer::default().impute(&gapped.frame, &gapped.columns)?;
//! let mae = Evaluator.score(
//!     &df,
//!     &outcome.frame,
//!     &gapped.columns,
//!     MetricKind::Mae,
//!     ScoringMask::Injected(&gapped.mask),
//! )?;
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod imputers;
pub mod injector;
pub mod pipeline;
pub mod reporting;
pub mod table;

// Re-exports for convenient access
pub use config::{
    BenchmarkConfig, BenchmarkConfigBuilder, ConfigValidationError, DatasetSpec, FillStatistic,
    ImputationOrder, IterativeSettings, MissingMechanism, PercentRange, Scenario, ScoringPolicy,
    SoftImputeSettings,
};
pub use dataset::load_dataset;
pub use error::{BenchError, Result as BenchResult, ResultExt};
pub use evaluation::{ColumnScore, Evaluator, MetricKind, MetricRecord, ScoringMask};
pub use imputers::{
    ImputationOutcome, Imputer, IterativeImputer, SoftImputer, StatisticalImputer,
    default_imputers,
};
pub use injector::{BurstBlock, GappedTable, InjectionMask, MissingValueInjector};
pub use pipeline::{
    AutoAdvance, BenchmarkRunner, BenchmarkRunnerBuilder, BenchmarkStage, CancellationToken,
    ClosureProgressReporter, GateDecision, ProgressReporter, ProgressUpdate, ScenarioGate,
    StdinGate,
};
pub use reporting::{
    BenchmarkReport, DatasetReport, InjectionSummary, NoopObserver, ScenarioReport,
    StrategyReport, SummaryObserver, TableObserver,
};
pub use table::{ColumnCount, TargetBlock};
