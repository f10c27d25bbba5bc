//! Observation side channel.
//!
//! The runner shows every table it works with to a [`TableObserver`]: the
//! loaded dataset, the gapped table, and each reconstruction. Observers
//! return nothing and cannot influence the run.

use crate::table::{is_numeric_dtype, missing_counts};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Receives tables as the benchmark progresses.
pub trait TableObserver: Send + Sync {
    /// `label` names the stage, e.g. `"seattle-weather.csv (gapped)"`.
    fn observe(&self, label: &str, df: &DataFrame, columns: &[String]);
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TableObserver for NoopObserver {
    fn observe(&self, _label: &str, _df: &DataFrame, _columns: &[String]) {}
}

/// Descriptive statistics of one numeric column, nulls excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub nulls: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Stats for `column`, `None` when it is absent, non-numeric or empty.
    pub fn describe(df: &DataFrame, column: &str) -> Option<Self> {
        let series = df.column(column).ok()?.as_materialized_series();
        if !is_numeric_dtype(series.dtype()) {
            return None;
        }

        let floats = series.cast(&DataType::Float64).ok()?;
        let values = floats.f64().ok()?;
        let nulls = values.null_count();
        let count = values.len() - nulls;
        if count == 0 {
            return None;
        }

        Some(Self {
            column: column.to_string(),
            count,
            nulls,
            mean: values.mean()?,
            std: (count > 1).then(|| values.std(1)).flatten(),
            min: values.min()?,
            max: values.max()?,
        })
    }
}

/// Logs shape, null counts and per-column statistics through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryObserver;

impl TableObserver for SummaryObserver {
    fn observe(&self, label: &str, df: &DataFrame, columns: &[String]) {
        info!("{}: {} rows x {} columns", label, df.height(), df.width());

        let nulls: Vec<String> = missing_counts(df)
            .into_iter()
            .filter(|c| c.missing > 0)
            .map(|c| format!("{}={}", c.column, c.missing))
            .collect();
        if nulls.is_empty() {
            info!("{}: no missing values", label);
        } else {
            info!("{}: missing values {}", label, nulls.join(", "));
        }

        for stats in columns.iter().filter_map(|c| ColumnStats::describe(df, c)) {
            info!(
                "  {:<16} count={:<6} mean={:>10.4} std={:>10} min={:>10.4} max={:>10.4}",
                stats.column,
                stats.count,
                stats.mean,
                stats
                    .std
                    .map(|s| format!("{:.4}", s))
                    .unwrap_or_else(|| "-".to_string()),
                stats.min,
                stats.max
            );
        }
    }
}

static_assertions::assert_obj_safe!(TableObserver);
