//! Missing-value injection.
//!
//! Removes a controlled, seeded fraction of the target cells of a complete
//! table under one of two mechanisms:
//!
//! - **random**: `num_missing` independent (row, column) picks. Picks can
//!   repeat, so the number of distinct nulled cells is at most `num_missing`.
//! - **burst**: `max(1, num_missing / B)` blocks of `B` consecutive rows in a
//!   single column. Blocks may overlap.
//!
//! The input frame is never mutated. Every nulled cell is recorded in an
//! [`InjectionMask`] so the evaluator can score exactly those cells.

use crate::config::{DEFAULT_BURST_LENGTH, MissingMechanism, PercentRange};
use crate::error::{BenchError, Result};
use crate::table::{column_values, resolve_target_columns, set_column_values};
use polars::prelude::*;
use rand::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Set of (column, row) cells the injector nulled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionMask {
    cells: BTreeMap<String, BTreeSet<usize>>,
}

impl InjectionMask {
    pub fn insert(&mut self, column: &str, row: usize) {
        self.cells.entry(column.to_string()).or_default().insert(row);
    }

    pub fn contains(&self, column: &str, row: usize) -> bool {
        self.cells.get(column).is_some_and(|rows| rows.contains(&row))
    }

    /// Rows nulled in `column`, ascending.
    pub fn rows(&self, column: &str) -> Option<&BTreeSet<usize>> {
        self.cells.get(column)
    }

    /// Columns with at least one nulled cell.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Number of distinct nulled cells.
    pub fn len(&self) -> usize {
        self.cells.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One block placed by the burst mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurstBlock {
    pub column: String,
    pub start: usize,
    pub len: usize,
}

/// A copy of the input table with gaps, plus what was done to it.
#[derive(Debug, Clone)]
pub struct GappedTable {
    /// The table with injected nulls.
    pub frame: DataFrame,
    /// Target columns that survived validation.
    pub columns: Vec<String>,
    pub mechanism: MissingMechanism,
    /// Percentage drawn from the scenario range.
    pub percent: f64,
    /// `floor(percent / 100 * rows * columns)`.
    pub requested_cells: usize,
    pub mask: InjectionMask,
    /// Blocks placed by the burst mechanism; empty for random.
    pub bursts: Vec<BurstBlock>,
}

impl GappedTable {
    fn unchanged(df: &DataFrame, mechanism: MissingMechanism) -> Self {
        Self {
            frame: df.clone(),
            columns: Vec::new(),
            mechanism,
            percent: 0.0,
            requested_cells: 0,
            mask: InjectionMask::default(),
            bursts: Vec::new(),
        }
    }

    /// Distinct cells actually nulled (`<= requested_cells` for random).
    pub fn realized_cells(&self) -> usize {
        self.mask.len()
    }
}

/// Seeded missing-value injector.
#[derive(Debug, Clone)]
pub struct MissingValueInjector {
    burst_length: usize,
}

impl Default for MissingValueInjector {
    fn default() -> Self {
        Self::new(DEFAULT_BURST_LENGTH)
    }
}

impl MissingValueInjector {
    /// Create an injector with the given burst block length (at least 1).
    pub fn new(burst_length: usize) -> Self {
        Self {
            burst_length: burst_length.max(1),
        }
    }

    pub fn burst_length(&self) -> usize {
        self.burst_length
    }

    /// Null a seeded fraction of the target cells of `df`.
    ///
    /// Target names that are unknown or non-numeric are dropped with a
    /// warning. When none remain the table is returned unchanged with an
    /// empty mask.
    ///
    /// # Errors
    ///
    /// [`BenchError::InsufficientRows`] when the burst mechanism is asked to
    /// work on a table shorter than one block, and
    /// [`BenchError::InvalidConfig`] for a malformed percent range.
    pub fn inject(
        &self,
        df: &DataFrame,
        target_columns: &[String],
        percent_range: PercentRange,
        seed: u64,
        mechanism: MissingMechanism,
    ) -> Result<GappedTable> {
        let columns = resolve_target_columns(df, target_columns);
        if columns.is_empty() {
            warn!("No valid columns provided for introducing missing values");
            return Ok(GappedTable::unchanged(df, mechanism));
        }

        if !percent_range.is_valid() {
            return Err(BenchError::InvalidConfig(format!(
                "percent range {} is not within 0-100 with min <= max",
                percent_range
            )));
        }

        let rows = df.height();
        if mechanism == MissingMechanism::Burst && rows < self.burst_length {
            return Err(BenchError::InsufficientRows {
                rows,
                burst_length: self.burst_length,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let percent = rng.gen_range(percent_range.min..=percent_range.max);
        let total_cells = rows * columns.len();
        let requested_cells = (total_cells as f64 * percent / 100.0).floor() as usize;

        info!(
            "Introducing '{}' missing values in columns {:?}",
            mechanism, columns
        );
        info!("{:.2}% of values -> {} cells", percent, requested_cells);

        let mut mask = InjectionMask::default();
        let mut bursts = Vec::new();

        match mechanism {
            MissingMechanism::Random => {
                for _ in 0..requested_cells {
                    let row = rng.gen_range(0..rows);
                    let column = &columns[rng.gen_range(0..columns.len())];
                    mask.insert(column, row);
                }
            }
            MissingMechanism::Burst => {
                let num_bursts = (requested_cells / self.burst_length).max(1);
                for _ in 0..num_bursts {
                    let column = &columns[rng.gen_range(0..columns.len())];
                    let start = rng.gen_range(0..=rows - self.burst_length);
                    for row in start..start + self.burst_length {
                        mask.insert(column, row);
                    }
                    bursts.push(BurstBlock {
                        column: column.clone(),
                        start,
                        len: self.burst_length,
                    });
                }
                debug!("Placed {} bursts of {} rows", num_bursts, self.burst_length);
            }
        }

        let frame = apply_mask(df, &mask)?;
        debug!(
            "Requested {} missing cells, {} distinct cells nulled",
            requested_cells,
            mask.len()
        );

        Ok(GappedTable {
            frame,
            columns,
            mechanism,
            percent,
            requested_cells,
            mask,
            bursts,
        })
    }

    /// Like [`inject`](Self::inject), with the mechanism given by name.
    ///
    /// Unknown names fall back to `"random"` with a warning.
    pub fn inject_named(
        &self,
        df: &DataFrame,
        target_columns: &[String],
        percent_range: PercentRange,
        seed: u64,
        mechanism: &str,
    ) -> Result<GappedTable> {
        let mechanism = MissingMechanism::from_name_or_default(mechanism);
        self.inject(df, target_columns, percent_range, seed, mechanism)
    }
}

/// Copy of `df` with every masked cell set to null.
fn apply_mask(df: &DataFrame, mask: &InjectionMask) -> Result<DataFrame> {
    let mut out = df.clone();
    for column in mask.columns() {
        let mut values = column_values(df, column)?;
        if let Some(rows) = mask.rows(column) {
            for &row in rows {
                values[row] = None;
            }
        }
        set_column_values(&mut out, column, values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::null_count;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn complete_frame(rows: usize) -> DataFrame {
        let base: Vec<f64> = (0..rows).map(|i| i as f64).collect();
        let doubled: Vec<f64> = base.iter().map(|v| v * 2.0).collect();
        let shifted: Vec<f64> = base.iter().map(|v| v + 100.0).collect();
        let noisy: Vec<f64> = base.iter().map(|v| (v * 0.37).sin()).collect();
        let untouched: Vec<i64> = (0..rows as i64).collect();
        df![
            "a" => base,
            "b" => doubled,
            "c" => shifted,
            "d" => noisy,
            "id" => untouched,
        ]
        .unwrap()
    }

    fn targets() -> Vec<String> {
        names(&["a", "b", "c", "d"])
    }

    fn total_nulls(df: &DataFrame) -> usize {
        df.get_columns().iter().map(|c| c.null_count()).sum()
    }

    // ========================================================================
    // random mechanism
    // ========================================================================

    #[test]
    fn test_random_ten_to_fifteen_percent_of_four_hundred_cells() {
        let df = complete_frame(100);
        let injector = MissingValueInjector::default();

        let gapped = injector
            .inject(&df, &targets(), PercentRange::new(10.0, 15.0), 42, MissingMechanism::Random)
            .unwrap();

        assert!((10.0..=15.0).contains(&gapped.percent));
        assert!((40..=60).contains(&gapped.requested_cells));
        assert!(gapped.realized_cells() <= gapped.requested_cells);
        assert!(gapped.realized_cells() > 0);
        assert_eq!(total_nulls(&gapped.frame), gapped.realized_cells());
    }

    #[test]
    fn test_random_thousand_rows() {
        let df = complete_frame(1000);
        let gapped = MissingValueInjector::default()
            .inject(&df, &targets(), PercentRange::new(10.0, 15.0), 42, MissingMechanism::Random)
            .unwrap();

        assert!((400..=600).contains(&gapped.requested_cells));
        assert!(gapped.realized_cells() <= gapped.requested_cells);
    }

    #[test]
    fn test_random_is_reproducible() {
        let df = complete_frame(200);
        let injector = MissingValueInjector::default();
        let range = PercentRange::new(20.0, 25.0);

        let first = injector.inject(&df, &targets(), range, 42, MissingMechanism::Random).unwrap();
        let second = injector.inject(&df, &targets(), range, 42, MissingMechanism::Random).unwrap();

        assert_eq!(first.percent, second.percent);
        assert_eq!(first.mask, second.mask);
        for column in targets() {
            assert_eq!(
                column_values(&first.frame, &column).unwrap(),
                column_values(&second.frame, &column).unwrap()
            );
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let df = complete_frame(200);
        let injector = MissingValueInjector::default();
        let range = PercentRange::new(10.0, 15.0);

        let first = injector.inject(&df, &targets(), range, 1, MissingMechanism::Random).unwrap();
        let second = injector.inject(&df, &targets(), range, 2, MissingMechanism::Random).unwrap();

        assert_ne!(first.mask, second.mask);
    }

    #[test]
    fn test_only_target_columns_altered() {
        let df = complete_frame(100);
        let gapped = MissingValueInjector::default()
            .inject(&df, &names(&["a", "c"]), PercentRange::new(30.0, 30.0), 9, MissingMechanism::Random)
            .unwrap();

        assert_eq!(null_count(&gapped.frame, "b"), Some(0));
        assert_eq!(null_count(&gapped.frame, "d"), Some(0));
        assert_eq!(null_count(&gapped.frame, "id"), Some(0));
        assert!(gapped.mask.columns().all(|c| c == "a" || c == "c"));
    }

    #[test]
    fn test_input_table_not_mutated() {
        let df = complete_frame(50);
        let _ = MissingValueInjector::default()
            .inject(&df, &targets(), PercentRange::new(20.0, 25.0), 42, MissingMechanism::Random)
            .unwrap();
        assert_eq!(total_nulls(&df), 0);
    }

    #[test]
    fn test_non_masked_cells_keep_values() {
        let df = complete_frame(60);
        let gapped = MissingValueInjector::default()
            .inject(&df, &targets(), PercentRange::new(20.0, 20.0), 3, MissingMechanism::Random)
            .unwrap();

        let original = column_values(&df, "b").unwrap();
        let after = column_values(&gapped.frame, "b").unwrap();
        for (row, (before, now)) in original.iter().zip(after.iter()).enumerate() {
            if gapped.mask.contains("b", row) {
                assert!(now.is_none());
            } else {
                assert_eq!(before, now);
            }
        }
    }

    #[test]
    fn test_zero_percent_random_injects_nothing() {
        let df = complete_frame(20);
        let gapped = MissingValueInjector::default()
            .inject(&df, &targets(), PercentRange::new(0.0, 0.0), 42, MissingMechanism::Random)
            .unwrap();
        assert_eq!(gapped.requested_cells, 0);
        assert!(gapped.mask.is_empty());
    }

    // ========================================================================
    // burst mechanism
    // ========================================================================

    #[test]
    fn test_burst_blocks_are_contiguous_single_column() {
        let df = complete_frame(100);
        let injector = MissingValueInjector::default();

        let gapped = injector
            .inject(&df, &targets(), PercentRange::new(10.0, 15.0), 42, MissingMechanism::Burst)
            .unwrap();

        assert_eq!(gapped.bursts.len(), (gapped.requested_cells / 5).max(1));
        for burst in &gapped.bursts {
            assert_eq!(burst.len, 5);
            assert!(burst.start + burst.len <= 100);
            assert!(targets().contains(&burst.column));
            for row in burst.start..burst.start + burst.len {
                assert!(gapped.mask.contains(&burst.column, row));
            }
        }
        assert!(gapped.realized_cells() <= gapped.bursts.len() * 5);
        assert_eq!(total_nulls(&gapped.frame), gapped.realized_cells());
    }

    #[test]
    fn test_burst_at_least_one_block_when_nothing_requested() {
        let df = complete_frame(10);
        let gapped = MissingValueInjector::default()
            .inject(&df, &targets(), PercentRange::new(0.0, 0.0), 42, MissingMechanism::Burst)
            .unwrap();

        assert_eq!(gapped.requested_cells, 0);
        assert_eq!(gapped.bursts.len(), 1);
        assert_eq!(gapped.realized_cells(), 5);
    }

    #[test]
    fn test_burst_exact_fit() {
        let df = complete_frame(5);
        let gapped = MissingValueInjector::default()
            .inject(&df, &targets(), PercentRange::new(50.0, 50.0), 1, MissingMechanism::Burst)
            .unwrap();

        assert!(gapped.bursts.iter().all(|b| b.start == 0));
    }

    #[test]
    fn test_burst_insufficient_rows() {
        let df = complete_frame(3);
        let result = MissingValueInjector::default().inject(
            &df,
            &targets(),
            PercentRange::new(10.0, 15.0),
            42,
            MissingMechanism::Burst,
        );

        match result {
            Err(BenchError::InsufficientRows { rows, burst_length }) => {
                assert_eq!(rows, 3);
                assert_eq!(burst_length, 5);
            }
            other => panic!("expected InsufficientRows, got {:?}", other.map(|g| g.requested_cells)),
        }
    }

    #[test]
    fn test_short_table_fine_for_random() {
        let df = complete_frame(3);
        let result = MissingValueInjector::default().inject(
            &df,
            &targets(),
            PercentRange::new(10.0, 15.0),
            42,
            MissingMechanism::Random,
        );
        assert!(result.is_ok());
    }

    // ========================================================================
    // column validation and mechanism names
    // ========================================================================

    #[test]
    fn test_unknown_columns_filtered() {
        let df = complete_frame(50);
        let gapped = MissingValueInjector::default()
            .inject(&df, &names(&["ghost", "a"]), PercentRange::new(10.0, 15.0), 42, MissingMechanism::Random)
            .unwrap();

        assert_eq!(gapped.columns, names(&["a"]));
        // 10-15% of 50 cells
        assert!((5..=7).contains(&gapped.requested_cells));
    }

    #[test]
    fn test_no_valid_columns_returns_unchanged() {
        let df = complete_frame(50);
        let gapped = MissingValueInjector::default()
            .inject(&df, &names(&["ghost"]), PercentRange::new(10.0, 15.0), 42, MissingMechanism::Burst)
            .unwrap();

        assert!(gapped.columns.is_empty());
        assert!(gapped.mask.is_empty());
        assert_eq!(total_nulls(&gapped.frame), 0);
        assert_eq!(gapped.frame.shape(), df.shape());
    }

    #[test]
    fn test_invalid_range_rejected() {
        let df = complete_frame(50);
        let result = MissingValueInjector::default().inject(
            &df,
            &targets(),
            PercentRange::new(30.0, 10.0),
            42,
            MissingMechanism::Random,
        );
        assert!(matches!(result, Err(BenchError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_mechanism_falls_back_to_random() {
        let df = complete_frame(80);
        let injector = MissingValueInjector::default();
        let range = PercentRange::new(10.0, 15.0);

        let fallback = injector.inject_named(&df, &targets(), range, 42, "zigzag").unwrap();
        let random = injector.inject(&df, &targets(), range, 42, MissingMechanism::Random).unwrap();

        assert_eq!(fallback.mechanism, MissingMechanism::Random);
        assert_eq!(fallback.mask, random.mask);
        assert!(fallback.bursts.is_empty());
    }

    #[test]
    fn test_named_burst() {
        let df = complete_frame(80);
        let gapped = MissingValueInjector::default()
            .inject_named(&df, &targets(), PercentRange::new(10.0, 15.0), 42, "burst")
            .unwrap();
        assert_eq!(gapped.mechanism, MissingMechanism::Burst);
        assert!(!gapped.bursts.is_empty());
    }
}
