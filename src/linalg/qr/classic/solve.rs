use crate::{
    assert,
    mat::{MatMut, MatRef},
};
use reborrow::*;

/// Given the QR decomposition of a matrix $A$ with `m` rows and `n` columns, as computed by
/// [`qr_in_place`](super::compute::qr_in_place), computes the least squares solution of
/// $$A X = B,$$
/// which is the exact solution when $A$ is square and invertible.
///
/// On entry, `rhs` holds $B$, with `m` rows. On exit, its top `n` rows hold $X$, and its bottom
/// `m - n` rows hold the components of $Q^\top B$ that $A$ cannot reach, whose norm is the norm of
/// the residual.
///
/// Reflections with `c[k] == 0.0` are skipped. The back substitution divides by the diagonal
/// `d` of $R$, so the decomposition must not have reported a singular column.
///
/// # Panics
/// - Panics if `rhs.nrows() != qr.nrows()`.
/// - Panics if `c.len()` or `d.len()` differ from `qr.ncols()`.
#[track_caller]
pub fn solve_in_place(qr: MatRef<'_, f64>, c: &[f64], d: &[f64], rhs: MatMut<'_, f64>) {
    let mut rhs = rhs;
    let m = qr.nrows();
    let n = qr.ncols();
    assert!(all(rhs.nrows() == m, c.len() == n, d.len() == n));

    for col in 0..rhs.ncols() {
        let mut b = rhs.rb_mut().col_mut(col);
        unsafe {
            // b = Q^T b
            for k in 0..n {
                if c[k] == 0.0 {
                    continue;
                }
                let mut sum = 0.0;
                for i in k..m {
                    sum += qr.read_unchecked(i, k) * b.read_unchecked(i, 0);
                }
                let tau = sum / c[k];
                for i in k..m {
                    let x = b.read_unchecked(i, 0) - tau * qr.read_unchecked(i, k);
                    b.write_unchecked(i, 0, x);
                }
            }

            // R x = b
            for i in (0..n).rev() {
                let mut sum = b.read_unchecked(i, 0);
                for j in i + 1..n {
                    sum -= qr.read_unchecked(i, j) * b.read_unchecked(j, 0);
                }
                b.write_unchecked(i, 0, sum / d[i]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert,
        linalg::{matmul::matmul, qr::classic::compute::qr_in_place, reductions::norm_max},
        mat,
        mat::Mat,
        Progress,
    };
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn square_system() {
        for n in [1, 4, 25] {
            let a = Mat::from_fn(n, n, |_, _| rand::random::<f64>());
            let b = Mat::from_fn(n, 3, |_, _| rand::random::<f64>());

            let mut qr = a.clone();
            let mut c = vec![0.0; n];
            let mut d = vec![0.0; n];
            qr_in_place(qr.as_mut(), &mut c, &mut d, Progress::none()).unwrap();

            let mut x = b.clone();
            solve_in_place(qr.as_ref(), &c, &d, x.as_mut());

            let mut residual = b.clone();
            matmul(residual.as_mut(), a.as_ref(), x.as_ref(), Some(1.0), -1.0);
            assert!(norm_max(residual.as_ref()) < 1e-9);
        }
    }

    #[test]
    fn least_squares_line_fit() {
        // y = 1 + 2 t, sampled exactly
        let a = mat![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0f64]];
        let mut b = mat![[1.0], [3.0], [5.0], [7.0f64]];

        let mut qr = a.clone();
        let mut c = [0.0; 2];
        let mut d = [0.0; 2];
        qr_in_place(qr.as_mut(), &mut c, &mut d, Progress::none()).unwrap();
        solve_in_place(qr.as_ref(), &c, &d, b.as_mut());

        assert_approx_eq!(b.read(0, 0), 1.0);
        assert_approx_eq!(b.read(1, 0), 2.0);
        assert!(b.read(2, 0).abs() < 1e-12);
        assert!(b.read(3, 0).abs() < 1e-12);
    }
}
