//! Gauss-Jordan elimination with full pivoting.
//!
//! Solves the linear system $AX = B$ for all the columns of $B$ at once, while replacing $A$ with
//! its inverse. At each step, the pivot is the largest element (in absolute value) among the rows
//! and columns that were not pivoted yet. The row of the pivot is moved to the diagonal, and the
//! column permutation that this implies is undone on the inverse at the end.

use crate::{
    assert,
    linalg::{lu::LuError, temp_vec_req},
    mat::{MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Gauss-Jordan tuning parameters.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct GaussJordanParams {
    /// Pivots with an absolute value below this threshold are rejected as singular.
    ///
    /// The default, `f64::MIN_POSITIVE`, only rejects exact zeros and subnormal pivots.
    pub epsilon: f64,
}

impl Default for GaussJordanParams {
    #[inline]
    fn default() -> Self {
        Self {
            epsilon: f64::MIN_POSITIVE,
        }
    }
}

/// Computes the size and alignment of required workspace for [`gauss_jordan_in_place`] and
/// [`gauss_jordan`] on an `n×n` matrix.
pub fn gauss_jordan_in_place_req(n: usize) -> Result<StackReq, SizeOverflow> {
    let v = temp_vec_req::<usize>(n)?;
    StackReq::try_all_of([v, v, v])
}

/// Solves $AX = B$ and inverts $A$ in place.
///
/// On entry, `matrix` holds $A$ and `rhs` holds $B$. On success, `matrix` holds $A^{-1}$ and
/// `rhs` holds $X$. `rhs` may have zero columns, in which case only the inverse is computed.
///
/// # Errors
/// Returns [`LuError::Singular`] if a column is selected as pivot twice, or if the magnitude of
/// the selected pivot is below `params.epsilon`. `column` is the elimination step at which this
/// happened. Both matrices are then partially overwritten.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if `rhs.nrows() != matrix.nrows()`.
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`gauss_jordan_in_place_req`]).
#[track_caller]
pub fn gauss_jordan_in_place(
    matrix: MatMut<'_, f64>,
    rhs: MatMut<'_, f64>,
    params: GaussJordanParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> Result<(), LuError> {
    let mut a = matrix;
    let mut b = rhs;
    let mut progress = progress;
    let n = a.nrows();
    assert!(all(a.ncols() == n, b.nrows() == n));

    crate::__warn_if_not_col_major!(a, GAUSS_JORDAN_WARN, "Gauss-Jordan elimination");

    let (pivot_count, stack) = stack.make_raw::<usize>(n);
    let (row_index, stack) = stack.make_raw::<usize>(n);
    let (col_index, _) = stack.make_raw::<usize>(n);
    pivot_count.fill(0);

    for step in 0..n {
        let mut big = 0.0f64;
        let mut found = None;
        for j in 0..n {
            if pivot_count[j] == 1 {
                continue;
            }
            for k in 0..n {
                if pivot_count[k] == 0 {
                    let abs = unsafe { a.read_unchecked(j, k) }.abs();
                    if abs >= big {
                        big = abs;
                        found = Some((j, k));
                    }
                }
            }
        }

        let Some((irow, icol)) = found else {
            return Err(LuError::Singular { column: step });
        };

        pivot_count[icol] += 1;
        if pivot_count[icol] > 1 {
            return Err(LuError::Singular { column: step });
        }

        if irow != icol {
            a.swap_rows(irow, icol);
            b.swap_rows(irow, icol);
        }
        row_index[step] = irow;
        col_index[step] = icol;

        let pivot = a.read(icol, icol);
        if !(pivot.abs() >= params.epsilon) || pivot == 0.0 {
            return Err(LuError::Singular { column: step });
        }

        let pivot_inv = 1.0 / pivot;
        a.write(icol, icol, 1.0);
        scale_row(a.rb_mut(), icol, pivot_inv);
        scale_row(b.rb_mut(), icol, pivot_inv);

        for row in 0..n {
            if row == icol {
                continue;
            }
            let factor = a.read(row, icol);
            a.write(row, icol, 0.0);
            if factor != 0.0 {
                sub_row(a.rb_mut(), row, icol, factor);
                sub_row(b.rb_mut(), row, icol, factor);
            }
        }

        progress.report_fraction(step + 1, n);
    }

    // the inverse of the row permuted matrix is the column permuted inverse
    for step in (0..n).rev() {
        if row_index[step] != col_index[step] {
            a.swap_cols(row_index[step], col_index[step]);
        }
    }

    progress.finish();
    Ok(())
}

#[inline]
fn scale_row(mut matrix: MatMut<'_, f64>, row: usize, factor: f64) {
    for j in 0..matrix.ncols() {
        unsafe {
            let x = matrix.read_unchecked(row, j) * factor;
            matrix.write_unchecked(row, j, x);
        }
    }
}

// matrix[dst, :] -= factor * matrix[src, :]
#[inline]
fn sub_row(mut matrix: MatMut<'_, f64>, dst: usize, src: usize, factor: f64) {
    for j in 0..matrix.ncols() {
        unsafe {
            let x = matrix.read_unchecked(dst, j) - factor * matrix.read_unchecked(src, j);
            matrix.write_unchecked(dst, j, x);
        }
    }
}

/// Solves $AX = B$ and inverts $A$ out of place, leaving `matrix` and `rhs` untouched.
///
/// `inverse` receives $A^{-1}$ and `solution` receives $X$.
///
/// # Errors
/// See [`gauss_jordan_in_place`].
///
/// # Panics
/// - Panics if `matrix` is not square, or `inverse` doesn't have the same shape as `matrix`.
/// - Panics if `solution` doesn't have the same shape as `rhs`, or `rhs.nrows() !=
/// matrix.nrows()`.
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`gauss_jordan_in_place_req`]).
#[track_caller]
pub fn gauss_jordan(
    inverse: MatMut<'_, f64>,
    solution: MatMut<'_, f64>,
    matrix: MatRef<'_, f64>,
    rhs: MatRef<'_, f64>,
    params: GaussJordanParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> Result<(), LuError> {
    let mut inverse = inverse;
    let mut solution = solution;
    inverse.copy_from(matrix);
    solution.copy_from(rhs);
    gauss_jordan_in_place(inverse, solution, params, stack, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{matmul::matmul, reductions::norm_max},
        mat,
        mat::Mat,
    };
    use assert_approx_eq::assert_approx_eq;

    macro_rules! make_stack {
        ($req: expr) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    #[test]
    fn inverse_and_solution() {
        for (n, k) in [(1, 1), (2, 3), (7, 2), (30, 4)] {
            let a = Mat::from_fn(n, n, |_, _| rand::random::<f64>());
            let b = Mat::from_fn(n, k, |_, _| rand::random::<f64>());

            let mut inv = Mat::zeros(n, n);
            let mut x = Mat::zeros(n, k);
            gauss_jordan(
                inv.as_mut(),
                x.as_mut(),
                a.as_ref(),
                b.as_ref(),
                Default::default(),
                make_stack!(gauss_jordan_in_place_req(n)),
                Progress::none(),
            )
            .unwrap();

            let mut id = Mat::<f64>::identity(n, n);
            matmul(id.as_mut(), a.as_ref(), inv.as_ref(), Some(1.0), -1.0);
            assert!(norm_max(id.as_ref()) < 1e-9);

            let mut residual = b.clone();
            matmul(residual.as_mut(), a.as_ref(), x.as_ref(), Some(1.0), -1.0);
            assert!(norm_max(residual.as_ref()) < 1e-9);
        }
    }

    #[test]
    fn pivoting_needed() {
        let mut a = mat![[0.0, 1.0], [1.0, 0.0f64]];
        let mut b = mat![[2.0], [3.0f64]];
        gauss_jordan_in_place(
            a.as_mut(),
            b.as_mut(),
            Default::default(),
            make_stack!(gauss_jordan_in_place_req(2)),
            Progress::none(),
        )
        .unwrap();
        assert!(a == mat![[0.0, 1.0], [1.0, 0.0]]);
        assert_approx_eq!(b.read(0, 0), 3.0);
        assert_approx_eq!(b.read(1, 0), 2.0);
    }

    #[test]
    fn singular_inputs() {
        let mut zero = Mat::<f64>::zeros(3, 3);
        let mut b = Mat::<f64>::zeros(3, 1);
        assert!(
            gauss_jordan_in_place(
                zero.as_mut(),
                b.as_mut(),
                Default::default(),
                make_stack!(gauss_jordan_in_place_req(3)),
                Progress::none(),
            )
            .is_err()
        );

        let mut rank_one = mat![[1.0, 2.0], [2.0, 4.0f64]];
        let mut b = Mat::<f64>::zeros(2, 0);
        assert!(
            gauss_jordan_in_place(
                rank_one.as_mut(),
                b.as_mut(),
                Default::default(),
                make_stack!(gauss_jordan_in_place_req(2)),
                Progress::none(),
            ) == Err(LuError::Singular { column: 1 })
        );
    }

    #[test]
    fn epsilon_threshold() {
        let mut a = mat![[1e-3, 0.0], [0.0, 1e-3f64]];
        let mut b = Mat::<f64>::zeros(2, 0);
        assert!(
            gauss_jordan_in_place(
                a.as_mut(),
                b.as_mut(),
                GaussJordanParams { epsilon: 1e-2 },
                make_stack!(gauss_jordan_in_place_req(2)),
                Progress::none(),
            ) == Err(LuError::Singular { column: 0 })
        );
    }
}
