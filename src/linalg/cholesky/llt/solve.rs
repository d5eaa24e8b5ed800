use crate::{
    assert,
    mat::{MatMut, MatRef},
};
use reborrow::*;

/// Given the Cholesky factor of a matrix $A$, as computed by
/// [`cholesky_in_place`](super::compute::cholesky_in_place), computes the solution of
/// $$A X = B,$$
/// and stores the result in `rhs`, which holds $B$ on entry.
///
/// The strictly lower triangular part of $L$ is read from `cholesky_factor`, and its diagonal
/// from `diag`.
///
/// # Panics
/// - Panics if `cholesky_factor` is not a square matrix.
/// - Panics if `diag.len()` or `rhs.nrows()` differ from the dimension of `cholesky_factor`.
#[track_caller]
pub fn solve_in_place(cholesky_factor: MatRef<'_, f64>, diag: &[f64], rhs: MatMut<'_, f64>) {
    let mut rhs = rhs;
    let l = cholesky_factor;
    let n = l.nrows();
    assert!(all(l.ncols() == n, diag.len() == n, rhs.nrows() == n));

    for c in 0..rhs.ncols() {
        let mut x = rhs.rb_mut().col_mut(c);
        unsafe {
            // L y = b
            for i in 0..n {
                let mut sum = x.read_unchecked(i, 0);
                for k in (0..i).rev() {
                    sum -= l.read_unchecked(i, k) * x.read_unchecked(k, 0);
                }
                x.write_unchecked(i, 0, sum / diag[i]);
            }
            // L^T x = y
            for i in (0..n).rev() {
                let mut sum = x.read_unchecked(i, 0);
                for k in i + 1..n {
                    sum -= l.read_unchecked(k, i) * x.read_unchecked(k, 0);
                }
                x.write_unchecked(i, 0, sum / diag[i]);
            }
        }
    }
}

/// Given the Cholesky factor of a matrix $A$, computes the solution of
/// $$A X = B,$$
/// and stores the result in `dst`.
///
/// # Panics
/// - Panics if `cholesky_factor` is not a square matrix.
/// - Panics if `rhs` and `dst` don't have the same shape, or if `diag.len()` or `rhs.nrows()`
/// differ from the dimension of `cholesky_factor`.
#[track_caller]
pub fn solve(
    dst: MatMut<'_, f64>,
    cholesky_factor: MatRef<'_, f64>,
    diag: &[f64],
    rhs: MatRef<'_, f64>,
) {
    let mut dst = dst;
    dst.copy_from(rhs);
    solve_in_place(cholesky_factor, diag, dst);
}
