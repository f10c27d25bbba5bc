//! Imputation strategies.
//!
//! This module provides the three strategies the benchmark compares:
//! - Statistical imputation (mean, median, most frequent)
//! - Iterative regression imputation (chained equations)
//! - Low-rank completion (soft-thresholded SVD)
//!
//! All of them implement [`Imputer`]. A strategy only has to complete a
//! dense block; the provided [`Imputer::impute`] method handles column
//! selection, timing, and writing the block back into a copy of the table.

mod iterative;
pub mod linalg;
mod soft_impute;
mod statistical;

pub use iterative::IterativeImputer;
pub use soft_impute::SoftImputer;
pub use statistical::StatisticalImputer;

use crate::error::{BenchError, Result};
use crate::table::{TargetBlock, observed_series, resolve_target_columns};
use ndarray::Array2;
use polars::prelude::*;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of running one strategy on a gapped table.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    /// Fully populated copy of the input table.
    pub frame: DataFrame,
    /// Wall-clock time spent completing the block.
    pub elapsed: Duration,
    /// Target columns that were actually imputed.
    pub columns: Vec<String>,
}

/// A missing-value imputation strategy.
///
/// Implementations must be `Send + Sync` so independent scenarios can be
/// run on other threads.
pub trait Imputer: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Complete a block where NaN marks a missing cell.
    ///
    /// The returned block must have the same shape. Observed cells are
    /// restored by the caller, so implementations may perturb them.
    fn impute_block(&self, block: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit on `df` and fill the gaps in `columns`, leaving other columns untouched.
    ///
    /// Unknown or non-numeric column names are dropped with a warning; when
    /// none remain the input is returned unchanged.
    fn impute(&self, df: &DataFrame, columns: &[String]) -> Result<ImputationOutcome> {
        let columns = resolve_target_columns(df, columns);
        if columns.is_empty() {
            warn!("{}: no valid target columns, returning input unchanged", self.name());
            return Ok(ImputationOutcome {
                frame: df.clone(),
                elapsed: Duration::ZERO,
                columns,
            });
        }

        let block = TargetBlock::from_frame(df, &columns)?;
        let observed = block.values();

        let start = Instant::now();
        let mut completed = self.impute_block(observed)?;
        let elapsed = start.elapsed();

        if completed.dim() != observed.dim() {
            return Err(BenchError::Internal(format!(
                "{} returned a {:?} block for a {:?} input",
                self.name(),
                completed.dim(),
                observed.dim()
            )));
        }

        restore_observed(observed, &mut completed);
        if let Some(j) = first_incomplete_column(&completed) {
            return Err(BenchError::ImputationFailed {
                column: columns[j].clone(),
                reason: format!("{} left non-finite values", self.name()),
            });
        }

        info!("{} execution time: {:.5} seconds", self.name(), elapsed.as_secs_f64());

        let frame = block.with_values(completed).write_into(df)?;
        Ok(ImputationOutcome {
            frame,
            elapsed,
            columns,
        })
    }
}

/// Copy every observed (non-NaN) cell of `observed` into `completed`.
pub(crate) fn restore_observed(observed: &Array2<f64>, completed: &mut Array2<f64>) {
    ndarray::Zip::from(completed)
        .and(observed)
        .for_each(|out, &orig| {
            if !orig.is_nan() {
                *out = orig;
            }
        });
}

fn first_incomplete_column(block: &Array2<f64>) -> Option<usize> {
    block
        .columns()
        .into_iter()
        .position(|col| col.iter().any(|v| !v.is_finite()))
}

/// Mean of the non-NaN entries, `None` when there are none.
pub(crate) fn observed_mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<f64> {
    observed_series("observed", values).mean()
}

/// The default strategy line-up, in reporting order.
pub fn default_imputers(config: &crate::config::BenchmarkConfig) -> Vec<Box<dyn Imputer>> {
    vec![
        Box::new(StatisticalImputer::new(config.statistic)),
        Box::new(IterativeImputer::from_settings(config.iterative, config.seed)),
        Box::new(SoftImputer::from_settings(config.soft_impute)),
    ]
}

static_assertions::assert_obj_safe!(Imputer);
