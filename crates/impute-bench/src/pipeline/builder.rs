//! Benchmark runner construction.
//!
//! [`BenchmarkRunner`] holds everything a run needs; the execution logic is
//! in the sibling `runner` module.

use crate::config::{BenchmarkConfig, ConfigValidationError};
use crate::evaluation::Evaluator;
use crate::imputers::{Imputer, default_imputers};
use crate::injector::MissingValueInjector;
use crate::pipeline::gate::{AutoAdvance, ScenarioGate, StdinGate};
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::reporting::{SummaryObserver, TableObserver};
use std::path::PathBuf;
use std::sync::Arc;

/// Drives the {dataset x scenario x strategy} matrix.
///
/// Use [`BenchmarkRunner::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use impute_bench::{BenchmarkConfig, BenchmarkRunner, AutoAdvance};
/// use std::sync::Arc;
///
/// let report = BenchmarkRunner::builder()
///     .config(BenchmarkConfig::default())
///     .data_dir("data")
///     .gate(Arc::new(AutoAdvance))
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
/// ```
pub struct BenchmarkRunner {
    pub(super) config: BenchmarkConfig,
    pub(super) data_dir: Option<PathBuf>,
    pub(super) injector: MissingValueInjector,
    pub(super) imputers: Vec<Box<dyn Imputer>>,
    pub(super) evaluator: Evaluator,
    pub(super) observer: Arc<dyn TableObserver>,
    pub(super) gate: Arc<dyn ScenarioGate>,
    pub(super) progress_reporter: Option<Arc<dyn ProgressReporter>>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) print_scenarios: bool,
}

static_assertions::assert_impl_all!(BenchmarkRunner: Send, Sync);

impl BenchmarkRunner {
    /// Create a new runner builder.
    pub fn builder() -> BenchmarkRunnerBuilder {
        BenchmarkRunnerBuilder::default()
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Strategy names in the order they run.
    pub fn imputer_names(&self) -> Vec<&'static str> {
        self.imputers.iter().map(|i| i.name()).collect()
    }

    /// Report progress if a reporter is configured.
    pub(super) fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`BenchmarkRunner`].
#[derive(Default)]
pub struct BenchmarkRunnerBuilder {
    config: Option<BenchmarkConfig>,
    data_dir: Option<PathBuf>,
    imputers: Option<Vec<Box<dyn Imputer>>>,
    observer: Option<Arc<dyn TableObserver>>,
    gate: Option<Arc<dyn ScenarioGate>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
    print_scenarios: bool,
}

static_assertions::assert_impl_all!(BenchmarkRunnerBuilder: Send);

impl BenchmarkRunnerBuilder {
    pub fn config(mut self, config: BenchmarkConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Directory relative dataset paths are resolved against.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Replace the strategy line-up.
    ///
    /// Defaults to [`default_imputers`]: statistic, iterative, low-rank.
    pub fn imputers(mut self, imputers: Vec<Box<dyn Imputer>>) -> Self {
        self.imputers = Some(imputers);
        self
    }

    /// Append one strategy to the line-up.
    pub fn imputer(mut self, imputer: Box<dyn Imputer>) -> Self {
        self.imputers.get_or_insert_with(Vec::new).push(imputer);
        self
    }

    /// Defaults to [`SummaryObserver`].
    pub fn observer(mut self, observer: Arc<dyn TableObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Defaults to [`StdinGate`] when the config asks for a pause, else [`AutoAdvance`].
    pub fn gate(mut self, gate: Arc<dyn ScenarioGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the run.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Print each scenario's results to stdout as soon as it finishes.
    pub fn print_scenarios(mut self, print: bool) -> Self {
        self.print_scenarios = print;
        self
    }

    /// Build the runner.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<BenchmarkRunner, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let imputers = self.imputers.unwrap_or_else(|| default_imputers(&config));
        let gate: Arc<dyn ScenarioGate> = match self.gate {
            Some(gate) => gate,
            None if config.pause_between_scenarios => Arc::new(StdinGate),
            None => Arc::new(AutoAdvance),
        };

        Ok(BenchmarkRunner {
            injector: MissingValueInjector::new(config.burst_length),
            data_dir: self.data_dir,
            imputers,
            evaluator: Evaluator,
            observer: self.observer.unwrap_or_else(|| Arc::new(SummaryObserver)),
            gate,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            print_scenarios: self.print_scenarios,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FillStatistic, MissingMechanism, Scenario};
    use crate::imputers::StatisticalImputer;
    use crate::pipeline::progress::BenchmarkStage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builder_default_lineup() {
        let runner = BenchmarkRunner::builder().build().unwrap();
        assert_eq!(
            runner.imputer_names(),
            vec!["simple_mean", "iterative", "soft_impute"]
        );
        assert_eq!(runner.injector.burst_length(), 5);
        assert!(!runner.cancellation_token.is_cancelled());
    }

    #[test]
    fn test_builder_custom_lineup() {
        let runner = BenchmarkRunner::builder()
            .imputer(Box::new(StatisticalImputer::new(FillStatistic::Median)))
            .build()
            .unwrap();
        assert_eq!(runner.imputer_names(), vec!["simple_median"]);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = BenchmarkConfig::default();
        config.scenarios = vec![Scenario::new(50.0, 10.0, MissingMechanism::Random)];
        assert!(BenchmarkRunner::builder().config(config).build().is_err());
    }

    #[test]
    fn test_builder_with_progress_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let runner = BenchmarkRunner::builder()
            .on_progress(move |_update| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        runner.report_progress(ProgressUpdate::new(BenchmarkStage::Loading, 0.0, "Test"));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_shares_cancellation_token() {
        let token = CancellationToken::new();
        let runner = BenchmarkRunner::builder()
            .cancellation_token(token.clone())
            .build()
            .unwrap();

        token.cancel();
        assert!(runner.cancellation_token.is_cancelled());
    }
}
