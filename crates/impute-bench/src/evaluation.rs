//! Reconstruction accuracy metrics.
//!
//! Compares a candidate table against the pre-injection ground truth,
//! column by column, over a chosen set of cells:
//!
//! - [`ScoringMask::Observed`]: every row where both tables hold a value
//! - [`ScoringMask::Injected`]: only the cells the injector nulled
//!
//! With a complete ground truth and a fully imputed candidate the observed
//! mask covers every row, so untouched cells (error 0) dilute the score.
//! The injected mask scores the reconstructed cells alone.

use crate::config::ScoringPolicy;
use crate::error::{BenchError, Result};
use crate::injector::InjectionMask;
use crate::table::column_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Error aggregate computed per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Mean absolute error
    Mae,
    /// Root mean squared error
    Rmse,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::Mae, MetricKind::Rmse];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Mae => "MAE",
            Self::Rmse => "RMSE",
        }
    }

    fn aggregate(&self, errors: &[f64]) -> f64 {
        let n = errors.len() as f64;
        match self {
            Self::Mae => errors.iter().map(|e| e.abs()).sum::<f64>() / n,
            Self::Rmse => (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt(),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cells included in a score.
#[derive(Debug, Clone, Copy)]
pub enum ScoringMask<'a> {
    Observed,
    Injected(&'a InjectionMask),
}

impl<'a> ScoringMask<'a> {
    /// Mask for a policy; `injected` is only read for [`ScoringPolicy::InjectedCells`].
    pub fn for_policy(policy: ScoringPolicy, injected: &'a InjectionMask) -> Self {
        match policy {
            ScoringPolicy::InjectedCells => Self::Injected(injected),
            ScoringPolicy::ObservedCells => Self::Observed,
        }
    }
}

/// Score of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScore {
    pub column: String,
    pub value: f64,
    /// Number of cells the value was computed over.
    pub cells: usize,
}

/// One metric over a set of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub kind: MetricKind,
    pub scores: Vec<ColumnScore>,
    /// Columns that could not be scored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl MetricRecord {
    /// Score for `column`, if it was computed.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.column == column)
            .map(|s| s.value)
    }
}

/// Stateless scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Compute `kind` for every column in `columns`.
    ///
    /// A cell is scorable when both sides hold a value and the truth is
    /// finite. Columns missing from either table, or with no scorable cells,
    /// are listed in [`MetricRecord::skipped`] with a warning.
    ///
    /// # Errors
    ///
    /// [`BenchError::ShapeMismatch`] when the tables differ in row count.
    pub fn score(
        &self,
        truth: &DataFrame,
        candidate: &DataFrame,
        columns: &[String],
        kind: MetricKind,
        mask: ScoringMask<'_>,
    ) -> Result<MetricRecord> {
        if truth.height() != candidate.height() {
            return Err(BenchError::ShapeMismatch {
                expected: truth.height(),
                actual: candidate.height(),
            });
        }

        let mut record = MetricRecord {
            kind,
            scores: Vec::with_capacity(columns.len()),
            skipped: Vec::new(),
        };

        for column in columns {
            if truth.column(column).is_err() || candidate.column(column).is_err() {
                warn!("Column '{}' not found in both tables; skipping {}", column, kind);
                record.skipped.push(column.clone());
                continue;
            }

            let expected = column_values(truth, column)?;
            let actual = column_values(candidate, column)?;
            let errors: Vec<f64> = expected
                .iter()
                .zip(actual.iter())
                .enumerate()
                .filter(|(row, _)| match mask {
                    ScoringMask::Observed => true,
                    ScoringMask::Injected(injected) => injected.contains(column, *row),
                })
                .filter_map(|(_, pair)| match pair {
                    (Some(t), Some(c)) if t.is_finite() => Some(c - t),
                    _ => None,
                })
                .collect();

            if errors.is_empty() {
                warn!("Column '{}' has no cells to score; skipping {}", column, kind);
                record.skipped.push(column.clone());
                continue;
            }

            let value = kind.aggregate(&errors);
            debug!("{} {}: {:.4} over {} cells", kind, column, value, errors.len());
            record.scores.push(ColumnScore {
                column: column.clone(),
                value,
                cells: errors.len(),
            });
        }

        Ok(record)
    }

    /// Both metric kinds, in [`MetricKind::ALL`] order.
    pub fn score_all(
        &self,
        truth: &DataFrame,
        candidate: &DataFrame,
        columns: &[String],
        mask: ScoringMask<'_>,
    ) -> Result<Vec<MetricRecord>> {
        MetricKind::ALL
            .iter()
            .map(|&kind| self.score(truth, candidate, columns, kind, mask))
            .collect()
    }
}
