use super::{
    compute::{lu_in_place, PartialPivLuParams},
    solve::solve_in_place,
};
use crate::{
    assert,
    linalg::{lu::LuError, matmul::matmul, temp_mat_req, temp_mat_uninit, temp_vec_req},
    mat::{MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Parameters of the refined linear solve.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct RefinementParams {
    /// Parameters of the LU decomposition.
    pub lu: PartialPivLuParams,
    /// Number of refinement passes applied to each column of the solution.
    pub iterations: usize,
}

impl Default for RefinementParams {
    #[inline]
    fn default() -> Self {
        Self {
            lu: PartialPivLuParams::default(),
            iterations: 2,
        }
    }
}

/// Computes the size and alignment of required workspace for solving an `n×n` system with `nrhs`
/// right-hand sides with [`solve_with_refinement`].
pub fn solve_with_refinement_req(n: usize, _nrhs: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        temp_mat_req(n, n)?,
        temp_vec_req::<usize>(n)?,
        temp_mat_req(n, 1)?,
    ])
}

/// Computes the solution of the linear system
/// $$A X = B,$$
/// and stores it in `dst`, improving each column with iterative refinement.
///
/// `matrix` is decomposed once, out of place. Each refinement pass computes the residual
/// $r = A x - b$ with the original `matrix`, solves $A \delta = r$ with the factors, and replaces
/// $x$ with $x - \delta$.
///
/// The decomposition covers the first 80% of the reported progress, and the refinement of each
/// column an equal share of the remaining 20%.
///
/// # Errors
/// Returns [`LuError::Singular`] if `matrix` is numerically singular. `dst` is then left
/// untouched.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if `rhs` and `dst` don't have the same shape, or their number of rows differs from
/// the dimension of `matrix`.
/// - Panics if the provided memory in `stack` is insufficient (see [`solve_with_refinement_req`]).
#[track_caller]
pub fn solve_with_refinement(
    dst: MatMut<'_, f64>,
    matrix: MatRef<'_, f64>,
    rhs: MatRef<'_, f64>,
    params: RefinementParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> Result<(), LuError> {
    let mut dst = dst;
    let mut progress = progress;
    let n = matrix.nrows();
    let k = rhs.ncols();
    assert!(all(
        matrix.ncols() == n,
        rhs.nrows() == n,
        dst.nrows() == n,
        dst.ncols() == k,
    ));

    let (mut lu, stack) = temp_mat_uninit(n, n, stack);
    let (perm, stack) = stack.make_raw::<usize>(n);
    let (mut residual, _) = temp_mat_uninit(n, 1, stack);

    lu.copy_from(matrix);
    lu_in_place(lu.rb_mut(), perm, params.lu, progress.sub(0, 80))?;

    dst.copy_from(rhs);
    let mut refine_progress = progress.sub(80, 100);
    for j in 0..k {
        let mut x = dst.rb_mut().col_mut(j);
        solve_in_place(lu.rb(), perm, x.rb_mut());

        for _ in 0..params.iterations {
            // r = A x - b
            residual.copy_from(rhs.col(j));
            matmul(residual.rb_mut(), matrix, x.rb(), Some(-1.0), 1.0);
            solve_in_place(lu.rb(), perm, residual.rb_mut());

            for i in 0..n {
                unsafe {
                    let value = x.read_unchecked(i, 0) - residual.read_unchecked(i, 0);
                    x.write_unchecked(i, 0, value);
                }
            }
        }
        refine_progress.report_fraction(j + 1, k);
    }

    progress.finish();
    Ok(())
}
