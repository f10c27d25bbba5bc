//! Statistical imputation methods.
//!
//! Fills every gap in a column with one summary statistic of that column's
//! observed values. No cross-column information is used.

use super::Imputer;
use crate::config::FillStatistic;
use crate::error::Result;
use crate::table::observed_series;
use ndarray::{Array2, ArrayView1};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Univariate statistic imputer (mean, median or most frequent).
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalImputer {
    statistic: FillStatistic,
}

impl StatisticalImputer {
    pub fn new(statistic: FillStatistic) -> Self {
        Self { statistic }
    }

    pub fn statistic(&self) -> FillStatistic {
        self.statistic
    }

    /// The fill value for one column, `None` if nothing is observed.
    pub fn fill_value(&self, column: ArrayView1<'_, f64>) -> Option<f64> {
        match self.statistic {
            FillStatistic::Mean => observed_series("fill", column.iter()).mean(),
            FillStatistic::Median => observed_series("fill", column.iter()).median(),
            FillStatistic::MostFrequent => most_frequent(column),
        }
    }
}

impl Imputer for StatisticalImputer {
    fn name(&self) -> &'static str {
        match self.statistic {
            FillStatistic::Mean => "simple_mean",
            FillStatistic::Median => "simple_median",
            FillStatistic::MostFrequent => "simple_most_frequent",
        }
    }

    fn impute_block(&self, block: &Array2<f64>) -> Result<Array2<f64>> {
        let mut filled = block.clone();

        for (j, mut column) in filled.columns_mut().into_iter().enumerate() {
            let fill = match self.fill_value(column.view()) {
                Some(value) => value,
                None => {
                    warn!("Column {} has no observed values; filling with 0.0", j);
                    0.0
                }
            };
            debug!("Column {}: {} = {:.4}", j, self.statistic.as_str(), fill);

            column.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }

        Ok(filled)
    }
}

/// Most frequent observed value; the smallest one wins ties.
fn most_frequent(column: ArrayView1<'_, f64>) -> Option<f64> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in column.iter().filter(|v| !v.is_nan()) {
        // -0.0 and 0.0 count as the same value
        let key = if v == 0.0 { 0f64.to_bits() } else { v.to_bits() };
        counts.entry(key).or_insert((v, 0)).1 += 1;
    }

    counts
        .into_values()
        .max_by(|(va, ca), (vb, cb)| {
            ca.cmp(cb)
                .then_with(|| vb.partial_cmp(va).unwrap_or(Ordering::Equal))
        })
        .map(|(value, _)| value)
}
