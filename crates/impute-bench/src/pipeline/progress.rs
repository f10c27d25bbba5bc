//! Progress reporting and cancellation support for the benchmark runner.
//!
//! The scenario matrix can take a while on large tables (the iterative and
//! low-rank strategies dominate), so the runner emits [`ProgressUpdate`]
//! events and checks a [`CancellationToken`] before every stage.
//!
//! # Example
//!
//! ```rust,ignore
//! use impute_bench::{BenchmarkRunner, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(30));
//!     token_clone.cancel();
//! });
//!
//! let report = BenchmarkRunner::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStage {
    /// Reading a dataset from disk
    Loading,
    /// Nulling cells for a scenario
    Injection,
    /// Running one strategy
    Imputation,
    /// Computing MAE and RMSE
    Evaluation,
    /// Waiting on the scenario gate
    Waiting,
    /// All datasets and scenarios done
    Complete,
    /// Run was cancelled by user
    Cancelled,
    /// Run failed with an error
    Failed,
}

impl BenchmarkStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Dataset",
            Self::Injection => "Injecting Missing Values",
            Self::Imputation => "Imputing Values",
            Self::Evaluation => "Evaluating",
            Self::Waiting => "Waiting",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

/// Progress event emitted by the runner.
///
/// `progress` is the fraction of (dataset, scenario) pairs finished so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: BenchmarkStage,

    /// Optional detail (e.g., "seattle-weather.csv", "iterative")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    pub message: String,

    /// Scenarios finished so far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    /// Scenarios in the whole run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: BenchmarkStage, progress: f32, message: impl Into<String>) -> Self {
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Progress derived from `current` of `total` scenarios.
    pub fn with_items(
        stage: BenchmarkStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            stage,
            sub_stage: Some(sub_stage.into()),
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: Some(current),
            items_total: Some(total),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(BenchmarkStage::Complete, 1.0, message)
    }

    pub fn cancelled() -> Self {
        Self::new(BenchmarkStage::Cancelled, 0.0, "Benchmark cancelled by user")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(BenchmarkStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be `Send + Sync`; the runner may be driven from a
/// background thread.
pub trait ProgressReporter: Send + Sync {
    /// Called at every stage boundary. Should not block.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running benchmark.
///
/// Clones share one atomic flag. The runner checks it before every stage
/// and returns [`BenchError::Cancelled`](crate::error::BenchError::Cancelled)
/// once it is set.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can drive another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
