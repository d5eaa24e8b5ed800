use crate::{
    assert,
    mat::{MatMut, MatRef},
};

/// Computes the reconstructed matrix, given its partial pivoting LU decomposition, and stores the
/// result in `dst`.
///
/// # Panics
/// - Panics if `lu_factors` is not a square matrix.
/// - Panics if `dst` doesn't have the same shape as `lu_factors`.
/// - Panics if `perm.len() != lu_factors.nrows()`.
#[track_caller]
pub fn reconstruct(dst: MatMut<'_, f64>, lu_factors: MatRef<'_, f64>, perm: &[usize]) {
    let mut dst = dst;
    let n = lu_factors.nrows();
    assert!(all(
        lu_factors.ncols() == n,
        dst.nrows() == n,
        dst.ncols() == n,
        perm.len() == n,
    ));

    // dst <- L U
    for j in 0..n {
        for i in 0..n {
            unsafe {
                let mut acc = if i <= j {
                    lu_factors.read_unchecked(i, j)
                } else {
                    0.0
                };
                for k in 0..Ord::min(i, j + 1) {
                    acc += lu_factors.read_unchecked(i, k) * lu_factors.read_unchecked(k, j);
                }
                dst.write_unchecked(i, j, acc);
            }
        }
    }

    // dst <- P^-1 L U
    for k in (0..n).rev() {
        dst.swap_rows(k, perm[k]);
    }
}
