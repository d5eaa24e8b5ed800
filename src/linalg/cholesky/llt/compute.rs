use super::CholeskyError;
use crate::{assert, mat::MatMut, progress::Progress};

/// Computes the Cholesky factor $L$ of a symmetric positive definite matrix $A$ such that
/// $$A = LL^\top,$$
/// in place.
///
/// Only the upper triangular part of `matrix` (diagonal included) is read. On success, the
/// strictly lower triangular part of $L$ overwrites the strictly lower triangular part of
/// `matrix`, and the diagonal of $L$ is stored in `diag`. The upper triangular part of `matrix`,
/// including its diagonal, is left untouched, so that $A$ can still be recovered from it.
///
/// # Errors
/// Returns [`CholeskyError::NotPositiveDefinite`] as soon as a diagonal element of $L$ would be
/// the square root of a non-positive number. The factorization stops there, leaving `matrix` and
/// `diag` partially overwritten.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if `diag.len() != matrix.nrows()`.
#[track_caller]
pub fn cholesky_in_place(
    matrix: MatMut<'_, f64>,
    diag: &mut [f64],
    progress: Progress<'_>,
) -> Result<(), CholeskyError> {
    let mut a = matrix;
    let mut progress = progress;
    let n = a.nrows();
    assert!(all(a.ncols() == n, diag.len() == n));

    crate::__warn_if_not_col_major!(a, CHOLESKY_WARN, "Cholesky decomposition");

    for i in 0..n {
        for j in i..n {
            unsafe {
                let mut sum = a.read_unchecked(i, j);
                for k in (0..i).rev() {
                    sum -= a.read_unchecked(i, k) * a.read_unchecked(j, k);
                }
                if i == j {
                    if !(sum > 0.0) {
                        return Err(CholeskyError::NotPositiveDefinite { minor: i + 1 });
                    }
                    diag[i] = sum.sqrt();
                } else {
                    a.write_unchecked(j, i, sum / diag[i]);
                }
            }
        }
        progress.report_fraction(i + 1, n);
    }

    progress.finish();
    Ok(())
}
