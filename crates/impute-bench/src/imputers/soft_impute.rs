//! Low-rank matrix completion by iterative singular-value soft-thresholding.
//!
//! Gaps start at zero. Each iteration takes the SVD of the current estimate,
//! shrinks every singular value by a fixed amount (dropping those that reach
//! zero), rebuilds the matrix from what is left and copies the rebuilt values
//! into the gaps only. Iteration stops once the gap values settle.
//!
//! The SVD comes from the eigen-decomposition of the Gram matrix: with
//! `X = U S Vᵀ`, the rebuilt matrix is `X V diag(t/s) Vᵀ` where `t` are the
//! shrunk singular values, so `U` is never formed.

use super::Imputer;
use super::linalg::right_singular;
use crate::config::SoftImputeSettings;
use crate::error::Result;
use ndarray::Array2;
use tracing::debug;

const SINGULAR_EPS: f64 = 1e-12;

/// Ratio between the largest singular value and the default shrinkage.
const SHRINKAGE_DIVISOR: f64 = 50.0;

/// Soft-thresholded SVD imputer.
#[derive(Debug, Clone, Default)]
pub struct SoftImputer {
    settings: SoftImputeSettings,
}

impl SoftImputer {
    pub fn from_settings(settings: SoftImputeSettings) -> Self {
        Self { settings }
    }

    /// Fix the shrinkage instead of deriving it from the data.
    pub fn with_shrinkage(mut self, value: f64) -> Self {
        self.settings.shrinkage_value = Some(value);
        self
    }

    pub fn with_max_rank(mut self, rank: usize) -> Self {
        self.settings.max_rank = Some(rank);
        self
    }

    pub fn with_max_iters(mut self, n: usize) -> Self {
        self.settings.max_iters = n.max(1);
        self
    }

    /// One shrink-and-rebuild pass. Returns the rebuilt matrix and its rank.
    fn svd_step(&self, x: &Array2<f64>, shrinkage: f64) -> (Array2<f64>, usize) {
        let p = x.ncols();
        let (singular, vectors) = right_singular(x);
        let keep = self.settings.max_rank.unwrap_or(p).min(p);

        let mut projector = Array2::<f64>::zeros((p, p));
        let mut rank = 0;
        for k in 0..keep {
            let s = singular[k];
            let shrunk = (s - shrinkage).max(0.0);
            if shrunk <= 0.0 || s <= SINGULAR_EPS {
                continue;
            }
            rank += 1;

            let weight = shrunk / s;
            for a in 0..p {
                for b in 0..p {
                    projector[[a, b]] += weight * vectors[[a, k]] * vectors[[b, k]];
                }
            }
        }

        (x.dot(&projector), rank)
    }

    /// Relative change of the gap values between two estimates.
    fn converged(&self, old: &Array2<f64>, new: &Array2<f64>, missing: &Array2<bool>) -> bool {
        let mut ssd = 0.0;
        let mut old_norm_sq = 0.0;
        for ((i, j), &is_missing) in missing.indexed_iter() {
            if is_missing {
                let diff = old[[i, j]] - new[[i, j]];
                ssd += diff * diff;
                old_norm_sq += old[[i, j]] * old[[i, j]];
            }
        }

        if old_norm_sq == 0.0 {
            return ssd == 0.0;
        }
        ssd.sqrt() / old_norm_sq.sqrt() < self.settings.convergence_threshold
    }
}

impl Imputer for SoftImputer {
    fn name(&self) -> &'static str {
        "soft_impute"
    }

    fn impute_block(&self, block: &Array2<f64>) -> Result<Array2<f64>> {
        let missing = block.mapv(f64::is_nan);
        if !missing.iter().any(|&m| m) {
            return Ok(block.clone());
        }

        let mut x = block.mapv(|v| if v.is_nan() { 0.0 } else { v });

        let shrinkage = self.settings.shrinkage_value.unwrap_or_else(|| {
            let (singular, _) = right_singular(&x);
            singular.first().copied().unwrap_or(0.0) / SHRINKAGE_DIVISOR
        });
        debug!("Soft-impute shrinkage value {:.6}", shrinkage);

        let max_iters = self.settings.max_iters.max(1);
        for iteration in 1..=max_iters {
            let (reconstruction, rank) = self.svd_step(&x, shrinkage);
            let converged = self.converged(&x, &reconstruction, &missing);

            ndarray::Zip::from(&mut x)
                .and(&reconstruction)
                .and(&missing)
                .for_each(|cell, &rebuilt, &is_missing| {
                    if is_missing {
                        *cell = rebuilt;
                    }
                });

            debug!("Iteration {}/{}: rank {}", iteration, max_iters, rank);
            if converged {
                debug!("Converged after {} iterations", iteration);
                break;
            }
        }

        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const NAN: f64 = f64::NAN;

    fn rank_one(rows: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, 3), |(i, j)| (i + 1) as f64 * (j + 1) as f64)
    }

    #[test]
    fn test_recovers_rank_one_block_better_than_mean() {
        let truth = rank_one(20);
        let mut gapped = truth.clone();
        gapped[[3, 1]] = NAN;
        gapped[[14, 2]] = NAN;

        let filled = SoftImputer::default().impute_block(&gapped).unwrap();

        for &(i, j) in &[(3, 1), (14, 2)] {
            let observed_mean = (0..20)
                .filter(|&r| r != i)
                .map(|r| truth[[r, j]])
                .sum::<f64>()
                / 19.0;
            let soft_error = (filled[[i, j]] - truth[[i, j]]).abs();
            let mean_error = (observed_mean - truth[[i, j]]).abs();
            assert!(soft_error < 3.0, "cell ({}, {}) off by {}", i, j, soft_error);
            assert!(soft_error < mean_error);
        }
    }

    #[test]
    fn test_complete_block_unchanged() {
        let block = rank_one(4);
        let filled = SoftImputer::default().impute_block(&block).unwrap();
        assert_eq!(filled, block);
    }

    #[test]
    fn test_huge_shrinkage_fills_zero() {
        let block = array![[1.0, 2.0], [NAN, 4.0], [5.0, NAN]];
        let filled = SoftImputer::default()
            .with_shrinkage(1e9)
            .impute_block(&block)
            .unwrap();
        assert_eq!(filled[[1, 0]], 0.0);
        assert_eq!(filled[[2, 1]], 0.0);
        assert_eq!(filled[[0, 0]], 1.0);
    }

    #[test]
    fn test_all_missing_column_is_finite() {
        let block = array![[NAN, 1.0, 2.0], [NAN, 2.0, 4.1], [NAN, 3.0, 5.9]];
        let filled = SoftImputer::default().impute_block(&block).unwrap();
        assert!(filled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_max_rank_limits_reconstruction() {
        let imputer = SoftImputer::default().with_max_rank(1).with_shrinkage(0.0);
        let x = array![[1.0, 0.0], [0.0, 2.0]];
        let (rebuilt, rank) = imputer.svd_step(&x, 0.0);
        assert_eq!(rank, 1);
        // only the dominant direction (second column) survives
        assert!(rebuilt[[0, 0]].abs() < 1e-9);
        assert!((rebuilt[[1, 1]] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_convergence_check() {
        let imputer = SoftImputer::default();
        let missing = array![[true, false]];
        let old = array![[100.0, 1.0]];
        let near = array![[100.01, 5.0]];
        let far = array![[90.0, 1.0]];
        assert!(imputer.converged(&old, &near, &missing));
        assert!(!imputer.converged(&old, &far, &missing));
    }
}
