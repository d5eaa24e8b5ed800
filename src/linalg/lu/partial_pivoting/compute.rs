use crate::{
    assert,
    linalg::{
        lu::LuError, matmul::matmul_with_threshold,
        triangular_solve::solve_unit_lower_triangular_in_place,
    },
    mat::MatMut,
    progress::Progress,
};
use reborrow::*;

/// LU factorization tuning parameters.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct PartialPivLuParams {
    /// Size above which the trailing matrix updates go through the cache-blocked multiply.
    pub blocksize: usize,
    /// Pivots with an absolute value below this threshold are rejected as singular.
    ///
    /// The default, `f64::MIN_POSITIVE`, only rejects exact zeros and subnormal pivots. Matrices
    /// that are singular up to rounding still factorize; pass a threshold scaled by the magnitude
    /// of the entries (e.g. `n * f64::EPSILON * norm_max(A)`) to reject them too.
    pub epsilon: f64,
}

impl Default for PartialPivLuParams {
    #[inline]
    fn default() -> Self {
        Self {
            blocksize: 48,
            epsilon: f64::MIN_POSITIVE,
        }
    }
}

/// Information about the resulting LU factorization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartialPivLuInfo {
    /// Number of transpositions that were performed, can be used to compute the determinant of
    /// $P$.
    pub transposition_count: usize,
}

fn lu_unblocked_column(
    mut matrix: MatMut<'_, f64>,
    col: usize,
    perm: &mut [usize],
    epsilon: f64,
) -> Result<usize, LuError> {
    let m = matrix.nrows();

    let mut max = 0.0f64;
    let mut pivot = 0;
    for i in 0..m {
        let abs = unsafe { matrix.read_unchecked(i, col) }.abs();
        if abs > max {
            max = abs;
            pivot = i;
        }
    }

    if !(max >= epsilon) || max == 0.0 {
        return Err(LuError::Singular { column: 0 });
    }

    perm[0] = pivot;
    matrix.swap_rows(0, pivot);

    let inv = 1.0 / unsafe { matrix.read_unchecked(0, col) };
    for i in 1..m {
        unsafe {
            let x = matrix.read_unchecked(i, col) * inv;
            matrix.write_unchecked(i, col, x);
        }
    }

    Ok((pivot != 0) as usize)
}

// `matrix` spans every column of the rows it covers, so that the transpositions found in the
// panel `matrix[:, col_start..col_start + n]` are applied to whole rows as soon as they are
// found.
fn lu_in_place_impl(
    mut matrix: MatMut<'_, f64>,
    col_start: usize,
    n: usize,
    perm: &mut [usize],
    params: PartialPivLuParams,
    progress: &mut Progress<'_>,
    total: usize,
) -> Result<usize, LuError> {
    let m = matrix.nrows();

    if n == 1 {
        let count = lu_unblocked_column(matrix, col_start, perm, params.epsilon)
            .map_err(|_| LuError::Singular { column: col_start })?;
        progress.report_fraction(col_start + 1, total);
        return Ok(count);
    }

    let bs = n / 2;
    let mut n_transpositions = 0;

    n_transpositions += lu_in_place_impl(
        matrix.rb_mut(),
        col_start,
        bs,
        &mut perm[..bs],
        params,
        progress,
        total,
    )?;

    {
        let (a00, mut a01, a10, mut a11) = matrix
            .rb_mut()
            .submatrix_mut(0, col_start, m, n)
            .split_at_mut(bs, bs);

        //  (L00    ) (U00 U01)   (A00 A01)
        //  (L10 L11) (    U11) = (A10 A11)
        //
        // U01 = L00^-1 A01
        // L11 U11 = A11 - L10 U01
        solve_unit_lower_triangular_in_place(a00.rb(), a01.rb_mut());
        matmul_with_threshold(
            a11.rb_mut(),
            a10.rb(),
            a01.rb(),
            Some(1.0),
            -1.0,
            params.blocksize,
        );
    }

    n_transpositions += lu_in_place_impl(
        matrix.rb_mut().subrows_mut(bs, m - bs),
        col_start + bs,
        n - bs,
        &mut perm[bs..],
        params,
        progress,
        total,
    )?;

    for p in &mut perm[bs..] {
        *p += bs;
    }

    Ok(n_transpositions)
}

/// Computes the LU decomposition of the given square matrix with partial pivoting, replacing the
/// matrix with its factors in place.
///
/// The decomposition is such that:
/// $$PA = LU,$$
/// where $P$ is a permutation matrix, $L$ is a unit lower triangular matrix, and $U$ is an upper
/// triangular matrix.
///
/// $L$ is stored in the strictly lower triangular half of `matrix`, with an implicit unit
/// diagonal, and $U$ is stored in the upper triangular half of `matrix`. $P$ is stored in `perm`
/// as a sequence of transpositions: at step `k`, rows `k` and `perm[k]` were swapped.
///
/// The matrix is split recursively into a left and right half, so that most of the work happens
/// in matrix multiplications of the trailing blocks.
///
/// # Errors
/// Returns [`LuError::Singular`] if the largest candidate pivot of some column is below
/// `params.epsilon` in absolute value. `matrix` and `perm` are then partially overwritten.
///
/// # Panics
/// - Panics if `matrix` is not square.
/// - Panics if `perm.len() != matrix.nrows()`.
#[track_caller]
pub fn lu_in_place(
    matrix: MatMut<'_, f64>,
    perm: &mut [usize],
    params: PartialPivLuParams,
    progress: Progress<'_>,
) -> Result<PartialPivLuInfo, LuError> {
    let mut matrix = matrix;
    let mut progress = progress;
    let n = matrix.nrows();
    assert!(all(matrix.ncols() == n, perm.len() == n));

    crate::__warn_if_not_col_major!(matrix, LU_WARN, "LU with partial pivoting");

    for (i, p) in perm.iter_mut().enumerate() {
        *p = i;
    }

    let transposition_count = if n == 0 {
        0
    } else {
        lu_in_place_impl(matrix.rb_mut(), 0, n, perm, params, &mut progress, n)?
    };

    progress.finish();
    Ok(PartialPivLuInfo {
        transposition_count,
    })
}
