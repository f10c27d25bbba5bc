//! Small dense linear algebra on `ndarray`.
//!
//! The target blocks are tall and narrow (thousands of rows, a handful of
//! columns), so everything here works on `p x p` systems: normal equations
//! for the regression strategy and the Gram matrix for the low-rank one.

use ndarray::{Array1, Array2};
use std::cmp::Ordering;

const SINGULAR_TOL: f64 = 1e-12;
const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_TOL: f64 = 1e-12;

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when `a` is (numerically) singular.
pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    debug_assert_eq!(a.dim(), (n, n));

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[[i, col]]
                .abs()
                .partial_cmp(&a[[j, col]].abs())
                .unwrap_or(Ordering::Equal)
        })?;

        if !(a[[pivot, col]].abs() > SINGULAR_TOL) {
            return None;
        }

        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }

    Some(x)
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order and the matching unit
/// eigenvectors as the columns of the second array.
pub fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    debug_assert_eq!(a.ncols(), n);

    let mut m = a.clone();
    let mut v = Array2::<f64>::eye(n);
    let norm = m.iter().map(|x| x * x).sum::<f64>().sqrt();

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off = off_diagonal_norm(&m);
        if off <= JACOBI_TOL * norm || off == 0.0 {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = m[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (mkp, mkq) = (m[[k, p]], m[[k, q]]);
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let (mpk, mqk) = (m[[p, k]], m[[q, k]]);
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[[j, j]].partial_cmp(&m[[i, i]]).unwrap_or(Ordering::Equal));

    let values = Array1::from_iter(order.iter().map(|&i| m[[i, i]]));
    let mut vectors = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }

    (values, vectors)
}

fn off_diagonal_norm(m: &Array2<f64>) -> f64 {
    let mut sum = 0.0;
    for ((i, j), x) in m.indexed_iter() {
        if i != j {
            sum += x * x;
        }
    }
    sum.sqrt()
}

/// Singular values and right singular vectors of `x`, via the Gram matrix.
///
/// Singular values are descending; vectors are the columns of the second
/// array. Tiny negative eigenvalues from round-off are clamped to zero.
pub fn right_singular(x: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let gram = x.t().dot(x);
    let (eigenvalues, vectors) = symmetric_eigen(&gram);
    (eigenvalues.mapv(|l| l.max(0.0).sqrt()), vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_solve_two_by_two() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![5.0, 10.0];
        let x = solve(a, b).unwrap();
        assert!(close(x[0], 1.0));
        assert!(close(x[1], 3.0));
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![2.0, 7.0];
        let x = solve(a, b).unwrap();
        assert!(close(x[0], 7.0));
        assert!(close(x[1], 2.0));
    }

    #[test]
    fn test_solve_singular_is_none() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        assert!(solve(a, b).is_none());
    }

    #[test]
    fn test_solve_empty_system() {
        let x = solve(Array2::zeros((0, 0)), Array1::zeros(0)).unwrap();
        assert!(x.is_empty());
    }

    #[test]
    fn test_eigen_known_values() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&a);
        assert!(close(values[0], 3.0));
        assert!(close(values[1], 1.0));

        // A v = lambda v
        for k in 0..2 {
            let v = vectors.column(k).to_owned();
            let av = a.dot(&v);
            for i in 0..2 {
                assert!(close(av[i], values[k] * v[i]));
            }
        }
    }

    #[test]
    fn test_eigen_reconstructs_matrix() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let (values, vectors) = symmetric_eigen(&a);
        let rebuilt = vectors.dot(&Array2::from_diag(&values)).dot(&vectors.t());
        for (x, y) in a.iter().zip(rebuilt.iter()) {
            assert!(close(*x, *y));
        }
        assert!(values[0] >= values[1] && values[1] >= values[2]);
    }

    #[test]
    fn test_right_singular_rank_one() {
        // Every row is a multiple of (1, 2)
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let (singular, _) = right_singular(&x);
        // ||x||_F = sqrt(14 * 5) = sqrt(70)
        assert!(close(singular[0], 70f64.sqrt()));
        assert!(singular[1].abs() < 1e-6);
    }
}
