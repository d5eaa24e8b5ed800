use crate::{
    assert, debug_assert,
    linalg::{
        householder::{
            apply_block_householder_on_the_left, apply_block_householder_on_the_left_req,
            apply_householder_on_the_left, make_householder_factor, make_householder_in_place,
        },
        temp_mat_req, temp_mat_uninit,
    },
    mat::MatMut,
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// QR factorization tuning parameters.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct QrParams {
    /// Number of columns of the panels that are factorized before being applied to the trailing
    /// matrix as a single block reflector.
    pub blocksize: usize,
    /// Size above which the block reflector products go through the cache-blocked multiply.
    pub matmul_threshold: usize,
}

impl Default for QrParams {
    #[inline]
    fn default() -> Self {
        Self {
            blocksize: 32,
            matmul_threshold: 48,
        }
    }
}

/// Returns the panel width used for a matrix whose smaller dimension is `size`. The configured
/// block size shrinks to half of `size` when it is larger than that, and a result below `2` means
/// that blocking is disabled.
#[inline]
pub(crate) fn effective_blocksize(size: usize, params: QrParams) -> usize {
    Ord::min(params.blocksize, size / 2)
}

/// Returns the number of leading columns that are factorized in full panels of `blocksize`
/// columns. The remaining `size - blocked_len(size, blocksize)` columns, fewer than a panel, are
/// finished one column at a time.
#[inline]
pub(crate) fn blocked_len(size: usize, blocksize: usize) -> usize {
    if blocksize < 2 {
        0
    } else {
        size / blocksize * blocksize
    }
}

/// Computes the QR decomposition of `matrix` in place, one column at a time, storing the
/// Householder coefficients in `householder_coeffs`.
pub(crate) fn qr_in_place_unblocked(matrix: MatMut<'_, f64>, householder_coeffs: &mut [f64]) {
    let mut matrix = matrix;
    let m = matrix.nrows();
    let n = matrix.ncols();
    let size = Ord::min(m, n);
    debug_assert!(householder_coeffs.len() == size);

    for j in 0..size {
        let (_, _, bottom_left, trailing) = matrix.rb_mut().split_at_mut(j, j + 1);
        let (mut head, mut essential) = bottom_left.col_mut(j).split_at_row_mut(1);

        let mut beta = head.read(0, 0);
        let tau = make_householder_in_place(&mut beta, essential.rb_mut());
        head.write(0, 0, beta);
        householder_coeffs[j] = tau;

        if trailing.ncols() > 0 {
            apply_householder_on_the_left(trailing, essential.rb(), tau);
        }
    }
}

/// Computes the size and alignment of required workspace for performing a QR decomposition of an
/// `m×n` matrix with [`qr_in_place`].
pub fn qr_in_place_req(m: usize, n: usize, params: QrParams) -> Result<StackReq, SizeOverflow> {
    let blocksize = effective_blocksize(Ord::min(m, n), params);
    if blocksize < 2 {
        return Ok(StackReq::empty());
    }
    StackReq::try_all_of([
        temp_mat_req(blocksize, blocksize)?,
        apply_block_householder_on_the_left_req(blocksize, n)?,
    ])
}

/// Computes the QR decomposition of a rectangular matrix $A$, into an orthogonal matrix $Q$,
/// represented as a sequence of Householder reflections, and an upper trapezoidal matrix $R$, such
/// that $$A = QR.$$
///
/// $R$ is stored in the upper trapezoidal part of `matrix`. The essential parts of the
/// Householder vectors are stored in its strictly lower trapezoidal part (with an implicit unit
/// diagonal), and their coefficients $\tau$ in `householder_coeffs`, so that
/// $$Q = H_0 \times \dots \times H_{k-1}, \quad H_i = I - \tau_i v_i v_i^\top.$$
///
/// The columns are processed in panels of `params.blocksize` columns (reduced to half the smaller
/// dimension of the matrix if needed). Each panel is factorized one column at a time, then its
/// reflections are applied to the trailing columns as one block reflector, so that most of the
/// work happens in matrix multiplications. The columns left over after the last full panel are
/// factorized one column at a time.
///
/// A column that is already zero below the diagonal gets $\tau = 0$, so this cannot fail.
///
/// # Panics
/// - Panics if `householder_coeffs.len() != min(matrix.nrows(), matrix.ncols())`.
/// - Panics if the provided memory in `stack` is insufficient (see [`qr_in_place_req`]).
#[track_caller]
pub fn qr_in_place(
    matrix: MatMut<'_, f64>,
    householder_coeffs: &mut [f64],
    params: QrParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) {
    let mut matrix = matrix;
    let mut stack = stack;
    let mut progress = progress;
    let m = matrix.nrows();
    let n = matrix.ncols();
    let size = Ord::min(m, n);
    assert!(householder_coeffs.len() == size);

    crate::__warn_if_not_col_major!(matrix, QR_WARN, "QR decomposition");

    let blocksize = effective_blocksize(size, params);
    let blocked = blocked_len(size, blocksize);
    let mut j = 0;

    while j < blocked {
        let bs = blocksize;
        let (mut panel, trailing) = matrix
            .rb_mut()
            .submatrix_mut(j, j, m - j, n - j)
            .split_at_col_mut(bs);

        qr_in_place_unblocked(panel.rb_mut(), &mut householder_coeffs[j..j + bs]);

        if trailing.ncols() > 0 {
            let (mut householder_factor, stack) = temp_mat_uninit(bs, bs, stack.rb_mut());
            make_householder_factor(
                householder_factor.rb_mut(),
                panel.rb(),
                &householder_coeffs[j..j + bs],
            );
            apply_block_householder_on_the_left(
                trailing,
                panel.rb(),
                householder_factor.rb(),
                true,
                params.matmul_threshold,
                stack,
            );
        }

        j += bs;
        progress.report_fraction(j, size);
    }

    qr_in_place_unblocked(
        matrix.rb_mut().submatrix_mut(j, j, m - j, n - j),
        &mut householder_coeffs[j..],
    );
    progress.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{
            matmul::matmul,
            qr::no_pivoting::reconstruct::{expand_q, expand_q_req},
            reductions::norm_max,
        },
        mat::Mat,
    };

    macro_rules! make_stack {
        ($req: expr $(,)?) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    fn reconstruct_factors(qr: &Mat<f64>, householder_coeffs: &[f64]) -> (Mat<f64>, Mat<f64>) {
        let m = qr.nrows();
        let n = qr.ncols();
        let size = householder_coeffs.len();

        let mut q = Mat::zeros(m, m);
        q.as_mut()
            .subcols_mut(0, size)
            .copy_from(qr.as_ref().subcols(0, size));
        expand_q(
            q.as_mut(),
            householder_coeffs,
            Default::default(),
            make_stack!(expand_q_req(m, m, Default::default())),
            Progress::none(),
        );

        let r = Mat::from_fn(m, n, |i, j| if i <= j { qr.read(i, j) } else { 0.0 });
        (q, r)
    }

    fn check(m: usize, n: usize, params: QrParams, zero: bool) {
        let mat_orig = Mat::from_fn(m, n, |_, _| {
            if zero {
                0.0
            } else {
                rand::random::<f64>() - 0.5
            }
        });
        let mut mat = mat_orig.clone();
        let size = Ord::min(m, n);
        let mut householder_coeffs = vec![0.0; size];

        qr_in_place(
            mat.as_mut(),
            &mut householder_coeffs,
            params,
            make_stack!(qr_in_place_req(m, n, params)),
            Progress::none(),
        );

        let (q, r) = reconstruct_factors(&mat, &householder_coeffs);

        let mut qtq = Mat::<f64>::identity(m, m);
        matmul(qtq.as_mut(), q.transpose(), q.as_ref(), Some(1.0), -1.0);
        assert!(norm_max(qtq.as_ref()) < 1e-12 * m as f64);

        let mut reconstructed = mat_orig.clone();
        matmul(
            reconstructed.as_mut(),
            q.as_ref(),
            r.as_ref(),
            Some(1.0),
            -1.0,
        );
        assert!(norm_max(reconstructed.as_ref()) < 1e-12 * m as f64);
    }

    #[test]
    fn test_unblocked() {
        for (m, n) in [(7, 7), (2, 2), (2, 4), (4, 2), (4, 4), (1, 3), (3, 1)] {
            let mut mat = Mat::from_fn(m, n, |_, _| rand::random::<f64>());
            let mat_orig = mat.clone();
            let mut householder_coeffs = vec![0.0; Ord::min(m, n)];
            qr_in_place_unblocked(mat.as_mut(), &mut householder_coeffs);

            let (q, r) = reconstruct_factors(&mat, &householder_coeffs);
            let mut reconstructed = mat_orig.clone();
            matmul(
                reconstructed.as_mut(),
                q.as_ref(),
                r.as_ref(),
                Some(1.0),
                -1.0,
            );
            assert!(norm_max(reconstructed.as_ref()) < 1e-12);
        }
    }

    #[test]
    fn test_blocked() {
        for (m, n) in [
            (7, 5),
            (5, 7),
            (7, 7),
            (16, 4),
            (2, 3),
            (4, 4),
            (64, 64),
            (100, 37),
            (37, 100),
            (130, 130),
        ] {
            check(m, n, Default::default(), false);
            check(
                m,
                n,
                QrParams {
                    blocksize: 3,
                    matmul_threshold: 0,
                },
                false,
            );
        }
    }

    #[test]
    fn test_zero() {
        for (m, n) in [(2, 3), (2, 2), (2, 4), (4, 2), (4, 4), (64, 64)] {
            check(
                m,
                n,
                QrParams {
                    blocksize: 8,
                    ..Default::default()
                },
                true,
            );
        }
    }

    #[test]
    fn blocksize_shrinks_to_half_of_smaller_dimension() {
        let params = QrParams::default();
        assert!(effective_blocksize(200, params) == 32);
        assert!(effective_blocksize(40, params) == 20);
        assert!(effective_blocksize(3, params) == 1);
    }

    #[test]
    fn only_a_partial_panel_is_left_unblocked() {
        assert!(blocked_len(64, 32) == 64);
        assert!(blocked_len(70, 32) == 64);
        assert!(blocked_len(40, 20) == 40);
        assert!(blocked_len(3, 1) == 0);
        assert!(blocked_len(0, 0) == 0);

        // the last panel ends at the last column
        let params = QrParams {
            blocksize: 32,
            ..Default::default()
        };
        assert!(blocked_len(64, effective_blocksize(64, params)) == 64);
        check(64, 64, params, false);
        check(96, 64, params, false);
    }

    #[test]
    fn padded_rows() {
        use crate::mat::{
            from_row_major_slice_with_line_width, from_row_major_slice_with_line_width_mut,
        };

        let (m, n) = (23, 9);
        let line = n + 5;
        let line_width = line * core::mem::size_of::<f64>();
        let params = QrParams {
            blocksize: 3,
            matmul_threshold: 0,
        };
        let mat_orig = Mat::from_fn(m, n, |_, _| rand::random::<f64>() - 0.5);
        let mut buffer = vec![f64::NAN; m * line];
        let mut householder_coeffs = vec![0.0; n];

        let mut view = from_row_major_slice_with_line_width_mut(&mut buffer, m, n, line_width);
        view.copy_from(mat_orig.as_ref());
        qr_in_place(
            view,
            &mut householder_coeffs,
            params,
            make_stack!(qr_in_place_req(m, n, params)),
            Progress::none(),
        );

        for i in 0..m {
            for j in n..line {
                assert!(buffer[i * line + j].is_nan());
            }
        }

        let qr = from_row_major_slice_with_line_width(&buffer, m, n, line_width).to_owned();
        let (q, r) = reconstruct_factors(&qr, &householder_coeffs);
        let mut reconstructed = mat_orig.clone();
        matmul(
            reconstructed.as_mut(),
            q.as_ref(),
            r.as_ref(),
            Some(1.0),
            -1.0,
        );
        assert!(norm_max(reconstructed.as_ref()) < 1e-12 * m as f64);
    }
}
