use super::compute::{effective_blocksize, QrParams};
use crate::{
    assert,
    linalg::{
        householder::{
            apply_block_householder_on_the_left, apply_block_householder_on_the_left_req,
            apply_householder_on_the_left, make_householder_factor,
        },
        temp_mat_req, temp_mat_uninit,
        triangular_solve::solve_upper_triangular_in_place,
    },
    mat::{MatMut, MatRef},
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for solving a least squares problem
/// with an `m×n` matrix and `rhs_ncols` right hand sides with [`solve_lstsq_in_place`].
#[inline]
pub fn solve_lstsq_in_place_req(
    m: usize,
    n: usize,
    rhs_ncols: usize,
    params: QrParams,
) -> Result<StackReq, SizeOverflow> {
    let blocksize = effective_blocksize(Ord::min(m, n), params);
    if blocksize < 2 {
        return Ok(StackReq::empty());
    }
    StackReq::try_all_of([
        temp_mat_req(blocksize, blocksize)?,
        apply_block_householder_on_the_left_req(blocksize, rhs_ncols)?,
    ])
}

/// Given the QR factors of a matrix $A$ with at least as many rows as columns, as computed by
/// [`qr_in_place`](super::compute::qr_in_place), and a matrix $B$ stored in `rhs`, computes the
/// solution of the linear system in the sense of least squares:
/// $$\min_X \|AX - B\|.$$
///
/// $Q^\top$ is applied to `rhs` with the same panels as the decomposition, then the top rows are
/// solved against $R$. On exit, the top `n = qr_factors.ncols()` rows of `rhs` hold $X$, and its
/// remaining rows hold the part of $Q^\top B$ that lies outside the range of $A$.
///
/// $R$ must be invertible, otherwise the solution contains infinities or NaNs.
///
/// # Panics
/// - Panics if `qr_factors` is not a tall (or square) matrix.
/// - Panics if `householder_coeffs.len() != qr_factors.ncols()`.
/// - Panics if `rhs.nrows() != qr_factors.nrows()`.
/// - Panics if the provided memory in `stack` is insufficient (see [`solve_lstsq_in_place_req`]).
#[track_caller]
pub fn solve_lstsq_in_place(
    qr_factors: MatRef<'_, f64>,
    householder_coeffs: &[f64],
    rhs: MatMut<'_, f64>,
    params: QrParams,
    stack: PodStack<'_>,
) {
    let mut rhs = rhs;
    let mut stack = stack;
    let m = qr_factors.nrows();
    let n = qr_factors.ncols();
    assert!(all(
        m >= n,
        householder_coeffs.len() == n,
        rhs.nrows() == m,
    ));

    crate::__warn_if_not_col_major!(rhs, LSTSQ_WARN, "Least squares solve");

    let blocksize = effective_blocksize(n, params);

    if blocksize < 2 {
        for j in 0..n {
            let essential = qr_factors.submatrix(j + 1, j, m - j - 1, 1);
            apply_householder_on_the_left(
                rhs.rb_mut().subrows_mut(j, m - j),
                essential,
                householder_coeffs[j],
            );
        }
    } else {
        let mut j = 0;
        while j < n {
            let bs = Ord::min(blocksize, n - j);
            let basis = qr_factors.submatrix(j, j, m - j, bs);
            let (mut householder_factor, stack) = temp_mat_uninit(bs, bs, stack.rb_mut());
            make_householder_factor(
                householder_factor.rb_mut(),
                basis,
                &householder_coeffs[j..j + bs],
            );
            apply_block_householder_on_the_left(
                rhs.rb_mut().subrows_mut(j, m - j),
                basis,
                householder_factor.rb(),
                true,
                params.matmul_threshold,
                stack,
            );
            j += bs;
        }
    }

    solve_upper_triangular_in_place(
        qr_factors.submatrix(0, 0, n, n),
        rhs.subrows_mut(0, n),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{
            matmul::matmul,
            qr::no_pivoting::compute::{qr_in_place, qr_in_place_req},
            reductions::{dot, norm_max},
        },
        mat,
        mat::Mat,
        Progress,
    };
    use assert_approx_eq::assert_approx_eq;

    macro_rules! make_stack {
        ($req: expr $(,)?) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    fn factorize(a: &Mat<f64>, params: QrParams) -> (Mat<f64>, Vec<f64>) {
        let m = a.nrows();
        let n = a.ncols();
        let mut qr = a.clone();
        let mut householder_coeffs = vec![0.0; Ord::min(m, n)];
        qr_in_place(
            qr.as_mut(),
            &mut householder_coeffs,
            params,
            make_stack!(qr_in_place_req(m, n, params)),
            Progress::none(),
        );
        (qr, householder_coeffs)
    }

    #[test]
    fn square_system() {
        for n in [1, 3, 20, 70] {
            for params in [
                QrParams::default(),
                QrParams {
                    blocksize: 4,
                    matmul_threshold: 0,
                },
            ] {
                let a = Mat::from_fn(n, n, |i, j| {
                    rand::random::<f64>() + if i == j { n as f64 } else { 0.0 }
                });
                let b = Mat::from_fn(n, 2, |_, _| rand::random::<f64>());
                let (qr, householder_coeffs) = factorize(&a, params);

                let mut x = b.clone();
                solve_lstsq_in_place(
                    qr.as_ref(),
                    &householder_coeffs,
                    x.as_mut(),
                    params,
                    make_stack!(solve_lstsq_in_place_req(n, n, 2, params)),
                );

                let mut residual = b.clone();
                matmul(residual.as_mut(), a.as_ref(), x.as_ref(), Some(1.0), -1.0);
                assert!(norm_max(residual.as_ref()) < 1e-10);
            }
        }
    }

    #[test]
    fn residual_is_orthogonal_to_range() {
        let (m, n) = (60, 17);
        let params = QrParams {
            blocksize: 5,
            ..Default::default()
        };
        let a = Mat::from_fn(m, n, |_, _| rand::random::<f64>() - 0.5);
        let b = Mat::from_fn(m, 1, |_, _| rand::random::<f64>());
        let (qr, householder_coeffs) = factorize(&a, params);

        let mut sol = b.clone();
        solve_lstsq_in_place(
            qr.as_ref(),
            &householder_coeffs,
            sol.as_mut(),
            params,
            make_stack!(solve_lstsq_in_place_req(m, n, 1, params)),
        );
        let x = sol.as_ref().subrows(0, n);

        // A^T (A x - b) = 0
        let mut residual = b.clone();
        matmul(residual.as_mut(), a.as_ref(), x, Some(-1.0), 1.0);
        for j in 0..n {
            assert!(dot(a.as_ref().col(j), residual.as_ref()).abs() < 1e-10);
        }
    }

    #[test]
    fn line_fit() {
        let a = mat![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0f64]];
        let mut b = mat![[1.0], [3.0], [5.0], [7.0f64]];
        let params = QrParams::default();
        let (qr, householder_coeffs) = factorize(&a, params);

        solve_lstsq_in_place(
            qr.as_ref(),
            &householder_coeffs,
            b.as_mut(),
            params,
            make_stack!(solve_lstsq_in_place_req(4, 2, 1, params)),
        );
        assert_approx_eq!(b.read(0, 0), 1.0);
        assert_approx_eq!(b.read(1, 0), 2.0);
    }
}
