//! Matrix multiplication.
//!
//! All the routines compute `acc := alpha * acc + beta * lhs * rhs`, where `alpha` is `None` to
//! overwrite `acc` without reading it. Accumulating and subtracting products are expressed as
//! `alpha = Some(1.0)` with `beta = 1.0` and `beta = -1.0` respectively.

use crate::{
    assert,
    mat::{MatMut, MatRef},
};
use reborrow::*;

/// Dimension above which [`matmul`] switches from the plain kernel to the cache-blocked one.
pub const DEFAULT_THRESHOLD: usize = 48;

#[track_caller]
#[inline]
fn check_dims(acc: &MatMut<'_, f64>, lhs: &MatRef<'_, f64>, rhs: &MatRef<'_, f64>) {
    assert!(all(
        acc.nrows() == lhs.nrows(),
        acc.ncols() == rhs.ncols(),
        lhs.ncols() == rhs.nrows(),
    ));
}

/// Computes the matrix product with a plain triple loop, accumulating each entry as a dot
/// product over the inner dimension.
#[track_caller]
pub fn matmul_plain(
    acc: MatMut<'_, f64>,
    lhs: MatRef<'_, f64>,
    rhs: MatRef<'_, f64>,
    alpha: Option<f64>,
    beta: f64,
) {
    let mut acc = acc;
    check_dims(&acc, &lhs, &rhs);
    let k = lhs.ncols();

    for j in 0..acc.ncols() {
        for i in 0..acc.nrows() {
            let mut dot = 0.0;
            for depth in 0..k {
                dot += unsafe { lhs.read_unchecked(i, depth) * rhs.read_unchecked(depth, j) };
            }
            let value = match alpha {
                Some(alpha) => alpha * unsafe { acc.read_unchecked(i, j) } + beta * dot,
                None => beta * dot,
            };
            unsafe { acc.write_unchecked(i, j, value) };
        }
    }
}

/// Computes the matrix product with the cache-blocked `gemm` kernel, on the current thread.
#[track_caller]
pub fn matmul_blocked(
    acc: MatMut<'_, f64>,
    lhs: MatRef<'_, f64>,
    rhs: MatRef<'_, f64>,
    alpha: Option<f64>,
    beta: f64,
) {
    let mut acc = acc;
    check_dims(&acc, &lhs, &rhs);

    let m = acc.nrows();
    let n = acc.ncols();
    let k = lhs.ncols();
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        match alpha {
            Some(alpha) => super::mat_ops::scale_in_place(acc, alpha),
            None => acc.fill_zero(),
        }
        return;
    }

    unsafe {
        gemm::gemm(
            m,
            n,
            k,
            acc.rb_mut().as_ptr_mut(),
            acc.col_stride(),
            acc.row_stride(),
            alpha.is_some(),
            lhs.as_ptr(),
            lhs.col_stride(),
            lhs.row_stride(),
            rhs.as_ptr(),
            rhs.col_stride(),
            rhs.row_stride(),
            alpha.unwrap_or(0.0),
            beta,
            false,
            false,
            false,
            gemm::Parallelism::None,
        )
    };
}

/// Computes the matrix product, using the cache-blocked kernel when the largest dimension of the
/// product exceeds `threshold`, and the plain kernel otherwise.
#[track_caller]
pub fn matmul_with_threshold(
    acc: MatMut<'_, f64>,
    lhs: MatRef<'_, f64>,
    rhs: MatRef<'_, f64>,
    alpha: Option<f64>,
    beta: f64,
    threshold: usize,
) {
    let size = acc.nrows().max(acc.ncols()).max(lhs.ncols());
    if size > threshold {
        matmul_blocked(acc, lhs, rhs, alpha, beta)
    } else {
        matmul_plain(acc, lhs, rhs, alpha, beta)
    }
}

/// Computes the matrix product, dispatching on [`DEFAULT_THRESHOLD`].
///
/// # Example
/// ```
/// use densolve::{linalg::matmul::matmul, mat, Mat};
///
/// let lhs = mat![[0.0, 2.0], [1.0, 3.0]];
/// let rhs = mat![[4.0, 6.0], [5.0, 7.0]];
///
/// let mut acc = Mat::<f64>::zeros(2, 2);
/// matmul(acc.as_mut(), lhs.as_ref(), rhs.as_ref(), None, 2.5);
///
/// assert_eq!(acc, mat![[25.0, 35.0], [47.5, 67.5]]);
/// ```
#[track_caller]
#[inline]
pub fn matmul(
    acc: MatMut<'_, f64>,
    lhs: MatRef<'_, f64>,
    rhs: MatRef<'_, f64>,
    alpha: Option<f64>,
    beta: f64,
) {
    matmul_with_threshold(acc, lhs, rhs, alpha, beta, DEFAULT_THRESHOLD)
}
