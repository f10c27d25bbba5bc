//! Scenario matrix execution.
//!
//! Strictly sequential: datasets in order, scenarios in order, strategies in
//! line-up order. Each scenario works on its own gapped copy of the dataset;
//! the loaded table is only read.

use super::builder::BenchmarkRunner;
use super::gate::GateDecision;
use super::progress::{BenchmarkStage, ProgressUpdate};
use crate::config::Scenario;
use crate::dataset::load_dataset;
use crate::error::{BenchError, Result, ResultExt};
use crate::evaluation::{MetricKind, ScoringMask};
use crate::imputers::Imputer;
use crate::injector::GappedTable;
use crate::reporting::{
    BenchmarkReport, DatasetReport, InjectionSummary, ScenarioError, ScenarioReport,
    StrategyReport, text,
};
use crate::table::{missing_counts, resolve_target_columns};
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Position in the scenario matrix.
struct Cursor {
    done: usize,
    total: usize,
}

impl Cursor {
    fn is_last(&self) -> bool {
        self.done + 1 >= self.total
    }
}

impl BenchmarkRunner {
    /// Run every configured scenario on every configured dataset.
    ///
    /// Datasets are loaded from disk, relative paths resolved against the
    /// data directory when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Cancelled`] if the cancellation token fires.
    /// Scenario-local failures (a burst that does not fit the table, a
    /// strategy that errors out) are recorded in the report instead.
    pub fn run(&self) -> Result<BenchmarkReport> {
        self.finish(self.run_internal())
    }

    /// Run every configured scenario on an in-memory table.
    pub fn run_dataset(
        &self,
        name: &str,
        frame: &DataFrame,
        columns: &[String],
    ) -> Result<BenchmarkReport> {
        self.finish(self.run_single(name, frame, columns))
    }

    fn run_single(&self, name: &str, frame: &DataFrame, columns: &[String]) -> Result<BenchmarkReport> {
        let mut report = BenchmarkReport::new(&self.config);
        let mut cursor = Cursor {
            done: 0,
            total: self.config.scenarios.len(),
        };
        self.run_dataset_into(&mut report, name, frame, columns, &mut cursor)?;
        Ok(report)
    }

    fn finish(&self, result: Result<BenchmarkReport>) -> Result<BenchmarkReport> {
        match result {
            Ok(report) => {
                info!(
                    "Benchmark finished: {} scenarios completed{}",
                    report.completed_scenarios(),
                    if report.stopped_early { " (stopped early)" } else { "" }
                );
                self.report_progress(ProgressUpdate::complete("Benchmark complete"));
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Benchmark error: {}", e);
                Err(e)
            }
        }
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        Ok(())
    }

    fn resolve_path(&self, path: &std::path::Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn run_internal(&self) -> Result<BenchmarkReport> {
        let mut report = BenchmarkReport::new(&self.config);
        let mut cursor = Cursor {
            done: 0,
            total: self.config.datasets.len() * self.config.scenarios.len(),
        };

        info!(
            "Starting benchmark: {} datasets x {} scenarios x {} strategies",
            self.config.datasets.len(),
            self.config.scenarios.len(),
            self.imputers.len()
        );

        for spec in &self.config.datasets {
            self.check_cancelled()?;

            let name = spec.display_name();
            let path = self.resolve_path(&spec.path);
            self.report_progress(ProgressUpdate::with_items(
                BenchmarkStage::Loading,
                name.clone(),
                cursor.done,
                cursor.total,
                format!("Loading {}", path.display()),
            ));

            let frame = load_dataset(&path, spec.date_column.as_deref())
                .context(format!("Loading dataset '{}'", name))?;

            self.run_dataset_into(&mut report, &name, &frame, &spec.target_columns, &mut cursor)?;
            if report.stopped_early {
                break;
            }
        }

        Ok(report)
    }

    fn run_dataset_into(
        &self,
        report: &mut BenchmarkReport,
        name: &str,
        frame: &DataFrame,
        columns: &[String],
        cursor: &mut Cursor,
    ) -> Result<()> {
        let target_columns = resolve_target_columns(frame, columns);
        info!("Dataset {}: {} rows, targets {:?}", name, frame.height(), target_columns);
        self.observer.observe(name, frame, &target_columns);

        let mut dataset = DatasetReport {
            name: name.to_string(),
            rows: frame.height(),
            target_columns: target_columns.clone(),
            scenarios: Vec::with_capacity(self.config.scenarios.len()),
        };

        for (i, scenario) in self.config.scenarios.iter().enumerate() {
            self.check_cancelled()?;

            let scenario_report =
                self.run_scenario(name, frame, &target_columns, i + 1, *scenario, cursor)?;
            if self.print_scenarios {
                println!("{}", text::render_scenario(name, &scenario_report));
            }
            dataset.scenarios.push(scenario_report);

            let label = format!("{} scenario {} ({})", name, i + 1, scenario);
            let is_last = cursor.is_last();
            cursor.done += 1;

            if !is_last {
                self.report_progress(ProgressUpdate::with_items(
                    BenchmarkStage::Waiting,
                    label.clone(),
                    cursor.done,
                    cursor.total,
                    "Waiting to continue",
                ));
                if self.gate.wait(&label) == GateDecision::Stop {
                    info!("Stopping after {}", label);
                    report.stopped_early = true;
                    break;
                }
            }
        }

        report.datasets.push(dataset);
        Ok(())
    }

    fn run_scenario(
        &self,
        name: &str,
        frame: &DataFrame,
        columns: &[String],
        index: usize,
        scenario: Scenario,
        cursor: &Cursor,
    ) -> Result<ScenarioReport> {
        let mut report = ScenarioReport::new(index, scenario);
        info!("{} scenario {}: {}", name, index, scenario);

        self.report_progress(ProgressUpdate::with_items(
            BenchmarkStage::Injection,
            format!("{} scenario {}", name, index),
            cursor.done,
            cursor.total,
            format!("Introducing {} missing values", scenario),
        ));

        let gapped = match self.injector.inject(
            frame,
            columns,
            scenario.percent_range,
            self.config.seed,
            scenario.mechanism,
        ) {
            Ok(gapped) => gapped,
            Err(e) if e.is_scenario_local() => {
                warn!("{} scenario {} skipped: {}", name, index, e);
                report.error = Some(ScenarioError::from(&e));
                return Ok(report);
            }
            Err(e) => return Err(e.with_context(format!("{} scenario {}", name, index))),
        };

        self.observer
            .observe(&format!("{} (gapped)", name), &gapped.frame, &gapped.columns);
        report.injection = Some(InjectionSummary::from(&gapped));
        report.missing_before = missing_counts(&gapped.frame);

        for imputer in &self.imputers {
            self.check_cancelled()?;
            match self.run_strategy(imputer.as_ref(), name, frame, &gapped, cursor) {
                Ok(strategy) => report.strategies.push(strategy),
                Err(e) => {
                    let e = e.with_context(format!("{} ({})", imputer.name(), scenario));
                    error!("{} scenario {} aborted: {}", name, index, e);
                    report.error = Some(ScenarioError::from(&e));
                    break;
                }
            }
        }

        Ok(report)
    }

    fn run_strategy(
        &self,
        imputer: &dyn Imputer,
        name: &str,
        truth: &DataFrame,
        gapped: &GappedTable,
        cursor: &Cursor,
    ) -> Result<StrategyReport> {
        self.report_progress(ProgressUpdate::with_items(
            BenchmarkStage::Imputation,
            imputer.name(),
            cursor.done,
            cursor.total,
            format!("Imputing with {}", imputer.name()),
        ));

        let outcome = imputer.impute(&gapped.frame, &gapped.columns)?;
        self.observer.observe(
            &format!("{} ({})", name, imputer.name()),
            &outcome.frame,
            &outcome.columns,
        );

        self.report_progress(ProgressUpdate::with_items(
            BenchmarkStage::Evaluation,
            imputer.name(),
            cursor.done,
            cursor.total,
            format!("Scoring {}", imputer.name()),
        ));

        let mask = ScoringMask::for_policy(self.config.scoring, &gapped.mask);
        let mae = self
            .evaluator
            .score(truth, &outcome.frame, &gapped.columns, MetricKind::Mae, mask)?;
        let rmse = self
            .evaluator
            .score(truth, &outcome.frame, &gapped.columns, MetricKind::Rmse, mask)?;

        for score in &mae.scores {
            debug!("{} MAE {}: {:.4}", imputer.name(), score.column, score.value);
        }

        Ok(StrategyReport {
            name: imputer.name().to_string(),
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            missing_after: missing_counts(&outcome.frame),
            mae,
            rmse,
        })
    }
}
