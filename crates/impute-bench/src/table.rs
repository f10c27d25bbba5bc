//! Shared table helpers.
//!
//! A table is a polars [`DataFrame`] and a missing cell is a polars null.
//! The strategies never touch the frame directly: they work on a
//! [`TargetBlock`], a dense `f64` matrix over the target columns where NaN
//! marks a gap.

use crate::error::Result;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

// =============================================================================
// Column Selection
// =============================================================================

/// Keep the requested columns that exist in `df` and hold numbers.
///
/// Unknown or non-numeric names are dropped with a warning; duplicates are
/// collapsed. Order follows `requested`.
pub fn resolve_target_columns(df: &DataFrame, requested: &[String]) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::with_capacity(requested.len());

    for name in requested {
        match df.column(name) {
            Ok(column) if is_numeric_dtype(column.dtype()) => {
                if !resolved.contains(name) {
                    resolved.push(name.clone());
                }
            }
            Ok(column) => {
                warn!(
                    "Column '{}' has non-numeric type {}; skipping",
                    name,
                    column.dtype()
                );
            }
            Err(_) => warn!("Column '{}' not found in table; skipping", name),
        }
    }

    resolved
}

// =============================================================================
// Value Access
// =============================================================================

/// Read a column as `f64`, nulls as `None`.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let floats = column.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Replace a column with the given `f64` values.
pub fn set_column_values(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    let series = Series::new(name.into(), values);
    df.replace(name, series)?;
    Ok(())
}

/// Null count of a single column, or `None` when absent.
pub fn null_count(df: &DataFrame, name: &str) -> Option<usize> {
    df.column(name).ok().map(|c| c.null_count())
}

/// Series over `values` with NaN turned into null, so polars aggregates skip it.
pub fn observed_series<'a>(name: &str, values: impl IntoIterator<Item = &'a f64>) -> Series {
    let values: Vec<Option<f64>> = values
        .into_iter()
        .map(|&v| (!v.is_nan()).then_some(v))
        .collect();
    Series::new(name.into(), values)
}

/// Copy of `df` where every float NaN is a null.
///
/// A NaN read from a file is a missing value like any other: it gets
/// imputed, counted as missing, and never scored as ground truth.
pub fn nan_to_null(df: DataFrame) -> Result<DataFrame> {
    let exprs: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::Float32 | DataType::Float64))
        .map(|c| col(c.name().clone()).fill_nan(lit(NULL)))
        .collect();

    if exprs.is_empty() {
        return Ok(df);
    }
    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Missing-value count for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub column: String,
    pub missing: usize,
}

/// Per-column null counts over every column of the frame.
pub fn missing_counts(df: &DataFrame) -> Vec<ColumnCount> {
    df.get_columns()
        .iter()
        .map(|col| ColumnCount {
            column: col.name().to_string(),
            missing: col.null_count(),
        })
        .collect()
}

// =============================================================================
// Target Block
// =============================================================================

/// Dense view of the target columns, NaN where the frame has a null.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetBlock {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl TargetBlock {
    /// Extract `columns` from `df`. Every name must exist.
    pub fn from_frame(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut values = Array2::from_elem((df.height(), columns.len()), f64::NAN);

        for (j, name) in columns.iter().enumerate() {
            for (i, value) in column_values(df, name)?.into_iter().enumerate() {
                if let Some(v) = value {
                    values[[i, j]] = v;
                }
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// `true` where the cell is missing.
    pub fn missing_mask(&self) -> Array2<bool> {
        self.values.mapv(f64::is_nan)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Same columns, new values.
    pub fn with_values(&self, values: Array2<f64>) -> Self {
        Self {
            columns: self.columns.clone(),
            values,
        }
    }

    /// Copy of `df` with the target columns replaced by this block.
    pub fn write_into(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for (j, name) in self.columns.iter().enumerate() {
            let column: Vec<Option<f64>> = self
                .values
                .column(j)
                .iter()
                .map(|v| if v.is_nan() { None } else { Some(*v) })
                .collect();
            set_column_values(&mut out, name, column)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_resolve_drops_unknown_and_non_numeric() {
        let df = df![
            "a" => [1.0, 2.0],
            "label" => ["x", "y"],
            "b" => [1i64, 2],
        ]
        .unwrap();

        let resolved = resolve_target_columns(&df, &names(&["a", "ghost", "label", "b", "a"]));
        assert_eq!(resolved, names(&["a", "b"]));
    }

    #[test]
    fn test_column_values_casts_integers() {
        let df = df!["n" => [Some(1i64), None, Some(3)]].unwrap();
        assert_eq!(column_values(&df, "n").unwrap(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_observed_series_nulls_nan() {
        let values = [1.0, f64::NAN, 3.0];
        let series = observed_series("a", values.iter());
        assert_eq!(series.null_count(), 1);
        assert_eq!(series.mean(), Some(2.0));
    }

    #[test]
    fn test_nan_to_null_only_touches_floats() {
        let df = df![
            "a" => [Some(1.0), Some(f64::NAN), None],
            "n" => [1i64, 2, 3],
            "label" => ["x", "y", "z"],
        ]
        .unwrap();

        let out = nan_to_null(df).unwrap();
        assert_eq!(out.column("a").unwrap().null_count(), 2);
        assert_eq!(column_values(&out, "a").unwrap(), vec![Some(1.0), None, None]);
        assert_eq!(out.column("n").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("label").unwrap().null_count(), 0);
    }

    #[test]
    fn test_missing_counts_covers_all_columns() {
        let df = df![
            "a" => [Some(1.0), None, None],
            "b" => ["x", "y", "z"],
        ]
        .unwrap();

        let counts = missing_counts(&df);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0], ColumnCount { column: "a".to_string(), missing: 2 });
        assert_eq!(counts[1].missing, 0);
    }

    #[test]
    fn test_target_block_round_trip_preserves_other_columns() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [Some(4.0), Some(5.0), None],
            "label" => ["x", "y", "z"],
        ]
        .unwrap();

        let block = TargetBlock::from_frame(&df, &names(&["a", "b"])).unwrap();
        assert_eq!(block.missing_count(), 2);
        assert!(block.missing_mask()[[1, 0]]);
        assert!(block.missing_mask()[[2, 1]]);

        let mut filled = block.values().clone();
        filled[[1, 0]] = 2.0;
        filled[[2, 1]] = 6.0;
        let out = block.with_values(filled).write_into(&df).unwrap();

        assert_eq!(out.column("a").unwrap().null_count(), 0);
        assert_eq!(column_values(&out, "b").unwrap(), vec![Some(4.0), Some(5.0), Some(6.0)]);
        let label_out = out.column("label").unwrap().as_materialized_series();
        let label_in = df.column("label").unwrap().as_materialized_series();
        assert!(label_out.equals(label_in));
    }
}
