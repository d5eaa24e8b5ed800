use super::compute::{effective_blocksize, QrParams};
use crate::{
    assert,
    linalg::{
        householder::{
            apply_block_householder_on_the_left, apply_block_householder_on_the_left_req,
            apply_householder_on_the_left, make_householder_factor,
        },
        mat_ops::scale_in_place,
        temp_mat_req, temp_mat_uninit,
    },
    mat::MatMut,
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

// Overwrites the `m×n` matrix holding `k` Householder vectors in its first columns with the first
// `n` columns of `H_0 ... H_{k-1}`, one reflection at a time, starting from the last one.
fn expand_q_unblocked(matrix: MatMut<'_, f64>, householder_coeffs: &[f64]) {
    let mut matrix = matrix;
    let n = matrix.ncols();
    let k = householder_coeffs.len();

    for j in k..n {
        let mut col = matrix.rb_mut().col_mut(j);
        col.fill_zero();
        col.write(j, 0, 1.0);
    }

    for i in (0..k).rev() {
        let tau = householder_coeffs[i];
        let (top_left, _, bottom_left, trailing) = matrix.rb_mut().split_at_mut(i, i + 1);
        let (mut head, mut essential) = bottom_left.col_mut(i).split_at_row_mut(1);

        if trailing.ncols() > 0 {
            apply_householder_on_the_left(trailing, essential.rb(), tau);
        }
        scale_in_place(essential.rb_mut(), -tau);
        head.write(0, 0, 1.0 - tau);
        top_left.col_mut(i).fill_zero();
    }
}

fn expand_q_impl(
    matrix: MatMut<'_, f64>,
    householder_coeffs: &[f64],
    offset: usize,
    params: QrParams,
    blocksize: usize,
    stack: PodStack<'_>,
    progress: &mut Progress<'_>,
) {
    let mut matrix = matrix;
    let mut stack = stack;
    let m = matrix.nrows();
    let n = matrix.ncols();
    let k = householder_coeffs.len();
    let total = offset + k;

    if blocksize < 2 || k <= blocksize {
        expand_q_unblocked(matrix, householder_coeffs);
        progress.report_fraction(k, total);
        return;
    }

    let bs = blocksize;

    // Q = (H_0 ... H_{bs-1}) diag(I, Q'), where Q' is the expansion of the trailing reflections
    expand_q_impl(
        matrix.rb_mut().submatrix_mut(bs, bs, m - bs, n - bs),
        &householder_coeffs[bs..],
        offset + bs,
        params,
        blocksize,
        stack.rb_mut(),
        progress,
    );
    matrix.rb_mut().submatrix_mut(0, bs, bs, n - bs).fill_zero();

    let (mut panel, trailing) = matrix.rb_mut().split_at_col_mut(bs);
    {
        let (mut householder_factor, stack) = temp_mat_uninit(bs, bs, stack.rb_mut());
        make_householder_factor(
            householder_factor.rb_mut(),
            panel.rb(),
            &householder_coeffs[..bs],
        );
        apply_block_householder_on_the_left(
            trailing,
            panel.rb(),
            householder_factor.rb(),
            false,
            params.matmul_threshold,
            stack,
        );
    }
    expand_q_unblocked(panel.rb_mut(), &householder_coeffs[..bs]);
    progress.report_fraction(k, total);
}

/// Computes the size and alignment of required workspace for expanding the orthogonal factor of a
/// QR decomposition into an `m×n` matrix with [`expand_q`].
pub fn expand_q_req(m: usize, n: usize, params: QrParams) -> Result<StackReq, SizeOverflow> {
    let blocksize = effective_blocksize(Ord::min(m, n), params);
    if blocksize < 2 {
        return Ok(StackReq::empty());
    }
    StackReq::try_all_of([
        temp_mat_req(blocksize, blocksize)?,
        apply_block_householder_on_the_left_req(blocksize, n)?,
    ])
}

/// Expands the Householder representation of the orthogonal factor of a QR decomposition into an
/// explicit matrix with orthonormal columns.
///
/// On entry, the first `k = householder_coeffs.len()` columns of `matrix` hold the Householder
/// vectors below their diagonal, as computed by
/// [`qr_in_place`](super::compute::qr_in_place). The rest of `matrix` is ignored. On exit,
/// `matrix` holds the first `n = matrix.ncols()` columns of
/// $$Q = H_0 \times \dots \times H_{k-1}.$$
///
/// With `n == k`, this is the thin factor of a QR decomposition of a tall matrix. With
/// `n == matrix.nrows()`, this is the full orthogonal matrix.
///
/// The trailing reflections are expanded first, recursively, then each panel of
/// `params.blocksize` reflections is applied to the already expanded columns as one block
/// reflector, and the panel itself is expanded one reflection at a time.
///
/// # Panics
/// - Panics if `matrix.ncols() > matrix.nrows()`.
/// - Panics if `householder_coeffs.len() > matrix.ncols()`.
/// - Panics if the provided memory in `stack` is insufficient (see [`expand_q_req`]).
#[track_caller]
pub fn expand_q(
    matrix: MatMut<'_, f64>,
    householder_coeffs: &[f64],
    params: QrParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) {
    let mut progress = progress;
    let m = matrix.nrows();
    let n = matrix.ncols();
    let k = householder_coeffs.len();
    assert!(all(n <= m, k <= n));

    crate::__warn_if_not_col_major!(matrix, EXPAND_Q_WARN, "Q expansion");

    let blocksize = effective_blocksize(n, params);
    expand_q_impl(
        matrix,
        householder_coeffs,
        0,
        params,
        blocksize,
        stack,
        &mut progress,
    );
    progress.finish();
}
