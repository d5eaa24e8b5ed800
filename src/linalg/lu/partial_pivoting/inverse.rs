use super::{
    compute::{lu_in_place, PartialPivLuParams},
    solve::solve_in_place,
};
use crate::{
    assert,
    linalg::{lu::LuError, temp_mat_req, temp_mat_uninit, temp_vec_req},
    mat::{MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the inverse of a matrix, given its partial pivoting LU decomposition, and stores the
/// result in `dst`.
///
/// # Panics
/// - Panics if `lu_factors` is not a square matrix.
/// - Panics if `dst` doesn't have the same shape as `lu_factors`.
/// - Panics if `perm.len() != lu_factors.nrows()`.
#[track_caller]
pub fn invert(dst: MatMut<'_, f64>, lu_factors: MatRef<'_, f64>, perm: &[usize]) {
    let mut dst = dst;
    let n = lu_factors.nrows();
    assert!(all(dst.nrows() == n, dst.ncols() == n));

    dst.fill_zero();
    for i in 0..n {
        dst.write(i, i, 1.0);
    }
    solve_in_place(lu_factors, perm, dst);
}

/// Computes the size and alignment of required workspace for inverting an `n×n` matrix in place.
pub fn invert_in_place_req(n: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([temp_mat_req(n, n)?, temp_vec_req::<usize>(n)?])
}

/// Replaces `matrix` with its inverse.
///
/// The decomposition phase covers the first half of the reported progress, and solving against
/// the columns of the identity the second half.
///
/// # Errors
/// Returns [`LuError::Singular`] if the matrix is numerically singular, in which case `matrix` is
/// left untouched.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if the provided memory in `stack` is insufficient (see [`invert_in_place_req`]).
#[track_caller]
pub fn invert_in_place(
    matrix: MatMut<'_, f64>,
    params: PartialPivLuParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> Result<(), LuError> {
    let mut matrix = matrix;
    let mut progress = progress;
    let n = matrix.nrows();
    assert!(matrix.ncols() == n);

    let (mut lu, stack) = temp_mat_uninit(n, n, stack);
    let (perm, _) = stack.make_raw::<usize>(n);
    lu.copy_from(matrix.rb());

    lu_in_place(lu.rb_mut(), perm, params, progress.sub(0, 50))?;

    matrix.fill_zero();
    {
        let mut solve_progress = progress.sub(50, 100);
        for j in 0..n {
            matrix.write(j, j, 1.0);
            solve_in_place(lu.rb(), perm, matrix.rb_mut().col_mut(j));
            solve_progress.report_fraction(j + 1, n);
        }
    }
    progress.finish();
    Ok(())
}
