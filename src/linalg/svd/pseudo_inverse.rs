//! Computes the pseudoinverse through the SVD, see:
//! https://en.wikipedia.org//wiki/Singular_value_decomposition#Pseudoinverse

use super::{compute_svd_in_place, compute_svd_req, SvdError, SvdParams};
use crate::{
    assert,
    linalg::{
        matmul::matmul, mat_ops::scale_in_place, temp_mat_req, temp_mat_uninit, temp_vec_req,
    },
    mat::{MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computes the size and alignment of required workspace for computing the pseudoinverse of an
/// `m×n` matrix with [`pseudo_inverse`].
pub fn pseudo_inverse_req(m: usize, n: usize) -> Result<StackReq, SizeOverflow> {
    let (m, n) = if n > m { (n, m) } else { (m, n) };
    StackReq::try_all_of([
        temp_mat_req(m, n)?,
        temp_mat_req(n, n)?,
        temp_vec_req::<f64>(n)?,
        compute_svd_req(m, n)?,
    ])
}

/// Computes the Moore-Penrose pseudoinverse $A^+$ of `matrix`, and stores it in `dst`.
///
/// The singular values of $A$ no larger than $\max(m, n) \times \varepsilon \times \sigma_{\max}$
/// are treated as zero. If none of them is above that tolerance, `dst` is filled with zeros.
/// Wide matrices are handled through $A^+ = ((A^\top)^+)^\top$.
///
/// # Errors
/// Returns [`SvdError::NoConvergence`] if the SVD of `matrix` did not converge. `dst` is left
/// untouched in that case.
///
/// # Panics
/// - Panics if `dst` is not `matrix.ncols()×matrix.nrows()`.
/// - Panics if the provided memory in `stack` is insufficient (see [`pseudo_inverse_req`]).
#[track_caller]
pub fn pseudo_inverse(
    dst: MatMut<'_, f64>,
    matrix: MatRef<'_, f64>,
    params: SvdParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> Result<(), SvdError> {
    let mut progress = progress;
    let m = matrix.nrows();
    let n = matrix.ncols();
    assert!(all(dst.nrows() == n, dst.ncols() == m));

    if n > m {
        return pseudo_inverse(
            dst.transpose_mut(),
            matrix.transpose(),
            params,
            stack,
            progress,
        );
    }

    let (mut u, stack) = temp_mat_uninit(m, n, stack);
    let (mut v, stack) = temp_mat_uninit(n, n, stack);
    let (s, stack) = stack.make_raw::<f64>(n);

    u.copy_from(matrix);
    compute_svd_in_place(
        u.rb_mut(),
        s,
        v.rb_mut(),
        params,
        stack,
        progress.sub(0, 90),
    )?;

    pseudo_inverse_from_svd(dst, u, s, v.rb());
    progress.finish();
    Ok(())
}

// Computes `V S^+ U^T` into `dst`, overwriting `u` with `U S^+`.
pub(crate) fn pseudo_inverse_from_svd(
    dst: MatMut<'_, f64>,
    u: MatMut<'_, f64>,
    s: &[f64],
    v: MatRef<'_, f64>,
) {
    let mut dst = dst;
    let mut u = u;
    let n = s.len();
    let size = Ord::max(u.nrows(), v.nrows());

    let s_max = s.iter().fold(0.0f64, |acc, &x| acc.max(x));
    let tolerance = size as f64 * f64::EPSILON * s_max;

    let mut rank = 0;
    for j in 0..n {
        let mut col = u.rb_mut().col_mut(j);
        if s[j] > tolerance {
            rank += 1;
            scale_in_place(col, 1.0 / s[j]);
        } else {
            col.fill_zero();
        }
    }

    if rank == 0 {
        dst.fill_zero();
    } else {
        matmul(dst, v, u.rb().transpose(), None, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, linalg::reductions::norm_max, mat, mat::Mat};
    use assert_approx_eq::assert_approx_eq;

    macro_rules! make_stack {
        ($req: expr $(,)?) => {
            ::dyn_stack::PodStack::new(&mut ::dyn_stack::GlobalPodBuffer::new($req.unwrap()))
        };
    }

    fn pinv(a: &Mat<f64>) -> Mat<f64> {
        let m = a.nrows();
        let n = a.ncols();
        let mut x = Mat::zeros(n, m);
        pseudo_inverse(
            x.as_mut(),
            a.as_ref(),
            SvdParams::default(),
            make_stack!(pseudo_inverse_req(m, n)),
            Progress::none(),
        )
        .unwrap();
        x
    }

    fn check_penrose(a: &Mat<f64>, x: &Mat<f64>) {
        // A X A = A
        let diff = &(&(a * x) * a) - a;
        assert!(norm_max(diff.as_ref()) < 1e-9);
        // X A X = X
        let diff = &(&(x * a) * x) - x;
        assert!(norm_max(diff.as_ref()) < 1e-9);
    }

    #[test]
    fn full_rank() {
        for (m, n) in [(1, 1), (4, 4), (9, 5), (5, 9), (30, 17)] {
            let a = Mat::from_fn(m, n, |_, _| rand::random::<f64>() - 0.5);
            let x = pinv(&a);
            check_penrose(&a, &x);
        }
    }

    #[test]
    fn square_invertible_is_inverse() {
        let a = mat![[2.0, 1.0], [1.0, 3.0f64]];
        let x = pinv(&a);
        assert_approx_eq!(x.read(0, 0), 0.6);
        assert_approx_eq!(x.read(0, 1), -0.2);
        assert_approx_eq!(x.read(1, 0), -0.2);
        assert_approx_eq!(x.read(1, 1), 0.4);
    }

    #[test]
    fn rank_deficient() {
        // maps e_2 to e_0 and e_0 to 2 e_1, and has rank 2
        let a = mat![
            [0.0, 0.0, 1.0],
            [2.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0f64],
        ];
        let x = pinv(&a);
        check_penrose(&a, &x);
        assert_approx_eq!(x.read(2, 0), 1.0);
        assert_approx_eq!(x.read(0, 1), 0.5);
        assert!(x.read(1, 0).abs() < 1e-12);

        let at = a.transpose().to_owned();
        let xt = pinv(&at);
        check_penrose(&at, &xt);
        assert_approx_eq!(xt.read(0, 2), 1.0);
        assert_approx_eq!(xt.read(1, 0), 0.5);
    }

    #[test]
    fn zero_matrix() {
        let a = Mat::<f64>::zeros(3, 2);
        let x = pinv(&a);
        assert!(x.nrows() == 2);
        assert!(x.ncols() == 3);
        assert!(norm_max(x.as_ref()) == 0.0);
    }
}
