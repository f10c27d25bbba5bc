//! Benchmark results and their presentation.
//!
//! [`BenchmarkReport`] is the one structure every output path shares:
//! - JSON on stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! The console form lives in [`text`]; the observation side channel run
//! before and after injection lives in [`TableObserver`].
//!
//! # Example
//!
//! ```rust,ignore
//! use impute_bench::{BenchmarkRunner, reporting::text};
//!
//! let report = BenchmarkRunner::builder().build()?.run()?;
//! print!("{}", text::render_report(&report));
//! report.write_to_dir("outputs")?;
//! ```

mod observer;
pub mod text;

pub use observer::{ColumnStats, NoopObserver, SummaryObserver, TableObserver};

use crate::config::{BenchmarkConfig, MissingMechanism, Scenario, ScoringPolicy};
use crate::error::{BenchError, Result, ResultExt};
use crate::evaluation::{MetricKind, MetricRecord};
use crate::injector::GappedTable;
use crate::table::ColumnCount;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name used by [`BenchmarkReport::write_to_dir`].
pub const REPORT_FILE_NAME: &str = "benchmark_report.json";

/// Results of a full run over every dataset and scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// RFC 3339 timestamp of report creation
    pub generated_at: String,
    pub seed: u64,
    pub burst_length: usize,
    pub scoring: ScoringPolicy,
    pub datasets: Vec<DatasetReport>,
    /// The scenario gate asked to stop before the matrix was exhausted.
    pub stopped_early: bool,
}

impl BenchmarkReport {
    pub fn new(config: &BenchmarkConfig) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            seed: config.seed,
            burst_length: config.burst_length,
            scoring: config.scoring,
            datasets: Vec::new(),
            stopped_early: false,
        }
    }

    /// Number of scenarios that ran to completion.
    pub fn completed_scenarios(&self) -> usize {
        self.datasets
            .iter()
            .flat_map(|d| &d.scenarios)
            .filter(|s| s.error.is_none())
            .count()
    }

    /// Scenarios that ended with an error.
    pub fn failed_scenarios(&self) -> impl Iterator<Item = (&DatasetReport, &ScenarioReport)> {
        self.datasets.iter().flat_map(|d| {
            d.scenarios
                .iter()
                .filter(|s| s.error.is_some())
                .map(move |s| (d, s))
        })
    }

    /// Write the report as pretty JSON to `dir/benchmark_report.json`.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context(format!("Creating '{}'", dir.display()))?;

        let path = dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).context(format!("Writing '{}'", path.display()))?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }
}

/// All scenarios run on one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReport {
    pub name: String,
    pub rows: usize,
    /// Target columns after validation against the table.
    pub target_columns: Vec<String>,
    pub scenarios: Vec<ScenarioReport>,
}

/// What the injector did in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionSummary {
    pub mechanism: MissingMechanism,
    /// Percentage drawn from the scenario range
    pub percent: f64,
    pub requested_cells: usize,
    /// Distinct cells actually nulled
    pub realized_cells: usize,
    /// Blocks placed (burst only)
    pub bursts: usize,
}

impl From<&GappedTable> for InjectionSummary {
    fn from(gapped: &GappedTable) -> Self {
        Self {
            mechanism: gapped.mechanism,
            percent: gapped.percent,
            requested_cells: gapped.requested_cells,
            realized_cells: gapped.realized_cells(),
            bursts: gapped.bursts.len(),
        }
    }
}

/// Error that ended a scenario, kept in serialisable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioError {
    pub code: String,
    pub message: String,
}

impl From<&BenchError> for ScenarioError {
    fn from(err: &BenchError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// One (dataset, scenario) cell of the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Position in the scenario list, starting at 1
    pub index: usize,
    pub scenario: Scenario,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection: Option<InjectionSummary>,
    /// Per-column nulls in the gapped table
    pub missing_before: Vec<ColumnCount>,
    pub strategies: Vec<StrategyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScenarioError>,
}

impl ScenarioReport {
    pub fn new(index: usize, scenario: Scenario) -> Self {
        Self {
            index,
            scenario,
            injection: None,
            missing_before: Vec::new(),
            strategies: Vec::new(),
            error: None,
        }
    }

    pub fn strategy(&self, name: &str) -> Option<&StrategyReport> {
        self.strategies.iter().find(|s| s.name == name)
    }
}

/// One strategy's result within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub name: String,
    pub elapsed_secs: f64,
    /// Per-column nulls after imputation
    pub missing_after: Vec<ColumnCount>,
    pub mae: MetricRecord,
    pub rmse: MetricRecord,
}

impl StrategyReport {
    pub fn metric(&self, kind: MetricKind) -> &MetricRecord {
        match kind {
            MetricKind::Mae => &self.mae,
            MetricKind::Rmse => &self.rmse,
        }
    }

    /// Unweighted mean of the per-column scores, `None` if nothing was scored.
    pub fn mean_score(&self, kind: MetricKind) -> Option<f64> {
        let scores = &self.metric(kind).scores;
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().map(|s| s.value).sum::<f64>() / scores.len() as f64)
    }
}
