use crate::{
    assert,
    mat::{MatMut, MatRef},
};

#[inline(always)]
unsafe fn factor_at(l: MatRef<'_, f64>, diag: &[f64], i: usize, k: usize) -> f64 {
    if i == k {
        *diag.get_unchecked(i)
    } else {
        l.read_unchecked(i, k)
    }
}

/// Computes the reconstructed matrix $LL^\top$, given its Cholesky factor, and stores the result
/// in `dst`.
///
/// # Panics
/// - Panics if `cholesky_factor` is not a square matrix.
/// - Panics if `dst` doesn't have the same shape as `cholesky_factor`, or `diag.len()` differs
/// from its dimension.
#[track_caller]
pub fn reconstruct(dst: MatMut<'_, f64>, cholesky_factor: MatRef<'_, f64>, diag: &[f64]) {
    let mut dst = dst;
    let l = cholesky_factor;
    let n = l.nrows();
    assert!(all(
        l.ncols() == n,
        diag.len() == n,
        dst.nrows() == n,
        dst.ncols() == n,
    ));

    for j in 0..n {
        for i in j..n {
            let mut acc = 0.0;
            for k in 0..=j {
                acc += unsafe { factor_at(l, diag, i, k) * factor_at(l, diag, j, k) };
            }
            dst.write(i, j, acc);
            dst.write(j, i, acc);
        }
    }
}
