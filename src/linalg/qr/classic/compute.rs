use super::QrError;
use crate::{
    assert,
    mat::{MatMut, MatRef},
    progress::Progress,
};

#[inline(always)]
fn sign(magnitude: f64, sign_of: f64) -> f64 {
    if sign_of >= 0.0 {
        magnitude.abs()
    } else {
        -magnitude.abs()
    }
}

/// Computes the QR decomposition of a matrix with at least as many rows as columns, in place.
///
/// See the [module level documentation](super) for the layout of the output. `c` and `d` must
/// both have `matrix.ncols()` elements.
///
/// # Errors
/// Returns [`QrError::Singular`] if some column was zero when its reflection was computed. The
/// decomposition is still complete in that case, with `c[k] == 0.0` and `d[k] == 0.0` for every
/// such column `k`.
///
/// # Panics
/// - Panics if `matrix.nrows() < matrix.ncols()`.
/// - Panics if `c.len()` or `d.len()` differ from `matrix.ncols()`.
#[track_caller]
pub fn qr_in_place(
    matrix: MatMut<'_, f64>,
    c: &mut [f64],
    d: &mut [f64],
    progress: Progress<'_>,
) -> Result<(), QrError> {
    let mut a = matrix;
    let mut progress = progress;
    let m = a.nrows();
    let n = a.ncols();
    assert!(all(m >= n, c.len() == n, d.len() == n));

    crate::__warn_if_not_col_major!(a, CLASSIC_QR_WARN, "QR decomposition");

    let mut singular = None;

    for k in 0..n {
        unsafe {
            if k + 1 == m {
                c[k] = 0.0;
                d[k] = a.read_unchecked(k, k);
                if d[k] == 0.0 {
                    singular.get_or_insert(k);
                }
                progress.report_fraction(k + 1, n);
                continue;
            }

            let mut scale = 0.0f64;
            for i in k..m {
                scale = scale.max(a.read_unchecked(i, k).abs());
            }

            if scale == 0.0 {
                singular.get_or_insert(k);
                c[k] = 0.0;
                d[k] = 0.0;
            } else {
                let mut sum = 0.0;
                for i in k..m {
                    let x = a.read_unchecked(i, k) / scale;
                    a.write_unchecked(i, k, x);
                    sum += x * x;
                }
                let sigma = sign(sum.sqrt(), a.read_unchecked(k, k));
                let head = a.read_unchecked(k, k) + sigma;
                a.write_unchecked(k, k, head);
                c[k] = sigma * head;
                d[k] = -scale * sigma;

                for j in k + 1..n {
                    let mut sum = 0.0;
                    for i in k..m {
                        sum += a.read_unchecked(i, k) * a.read_unchecked(i, j);
                    }
                    let tau = sum / c[k];
                    for i in k..m {
                        let x = a.read_unchecked(i, j) - tau * a.read_unchecked(i, k);
                        a.write_unchecked(i, j, x);
                    }
                }
            }
        }
        progress.report_fraction(k + 1, n);
    }

    match singular {
        Some(column) => Err(QrError::Singular { column }),
        None => {
            progress.finish();
            Ok(())
        }
    }
}

/// Computes the first `dst.ncols()` columns of the orthogonal factor $Q = Q_0 \dots Q_{n-1}$ of
/// the decomposition, and stores them in `dst`.
///
/// With `dst.ncols() == qr.ncols()`, this is the thin factor such that $A = QR$ with a square
/// $R$, and with `dst.ncols() == qr.nrows()`, the full orthogonal matrix.
///
/// # Panics
/// - Panics if `dst.nrows() != qr.nrows()` or `dst.ncols() > qr.nrows()`.
/// - Panics if `c.len() != qr.ncols()`.
#[track_caller]
pub fn compute_q(dst: MatMut<'_, f64>, qr: MatRef<'_, f64>, c: &[f64]) {
    let mut dst = dst;
    let m = qr.nrows();
    let n = qr.ncols();
    let p = dst.ncols();
    assert!(all(dst.nrows() == m, p <= m, c.len() == n));

    dst.fill_zero();
    for i in 0..p {
        dst.write(i, i, 1.0);
    }

    for k in (0..n).rev() {
        if c[k] == 0.0 {
            continue;
        }
        for j in 0..p {
            unsafe {
                let mut sum = 0.0;
                for i in k..m {
                    sum += qr.read_unchecked(i, k) * dst.read_unchecked(i, j);
                }
                let tau = sum / c[k];
                for i in k..m {
                    let x = dst.read_unchecked(i, j) - tau * qr.read_unchecked(i, k);
                    dst.write_unchecked(i, j, x);
                }
            }
        }
    }
}

/// Computes the upper triangular factor $R$ of the decomposition, and stores it in `dst`.
///
/// # Panics
/// - Panics if `dst` is not `qr.ncols()×qr.ncols()`.
/// - Panics if `d.len() != qr.ncols()`.
#[track_caller]
pub fn compute_r(dst: MatMut<'_, f64>, qr: MatRef<'_, f64>, d: &[f64]) {
    let mut dst = dst;
    let n = qr.ncols();
    assert!(all(dst.nrows() == n, dst.ncols() == n, d.len() == n));

    for j in 0..n {
        for i in 0..n {
            let value = match i.cmp(&j) {
                core::cmp::Ordering::Less => qr.read(i, j),
                core::cmp::Ordering::Equal => d[i],
                core::cmp::Ordering::Greater => 0.0,
            };
            dst.write(i, j, value);
        }
    }
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

    fn check_factorization(a: &Mat<f64>) -> Result<(), QrError> {
        let m = a.nrows();
        let n = a.ncols();
        let mut qr = a.clone();
        let mut c = vec![0.0; n];
        let mut d = vec![0.0; n];
        let result = qr_in_place(qr.as_mut(), &mut c, &mut d, Progress::none());

        let mut q = Mat::zeros(m, m);
        compute_q(q.as_mut(), qr.as_ref(), &c);
        let mut r = Mat::zeros(n, n);
        compute_r(r.as_mut(), qr.as_ref(), &d);

        // Q^T Q = I
        let mut qtq = Mat::<f64>::identity(m, m);
        matmul(qtq.as_mut(), q.transpose(), q.as_ref(), Some(1.0), -1.0);
        assert!(norm_max(qtq.as_ref()) < 1e-11 * m as f64);

        // Q[:, :n] R = A
        let mut qr_prod = a.clone();
        matmul(
            qr_prod.as_mut(),
            q.as_ref().subcols(0, n),
            r.as_ref(),
            Some(1.0),
            -1.0,
        );
        assert!(norm_max(qr_prod.as_ref()) < 1e-11 * m as f64);

        result
    }

    #[test]
    fn test_square_and_tall() {
        for (m, n) in [(1, 1), (2, 2), (5, 5), (7, 3), (30, 30), (40, 12)] {
            let a = Mat::from_fn(m, n, |_, _| rand::random::<f64>() - 0.5);
            check_factorization(&a).unwrap();
        }
    }

    #[test]
    fn zero_column_is_reported_after_completion() {
        let a = mat![
            [1.0, 0.0, 2.0],
            [3.0, 0.0, 1.0],
            [2.0, 0.0, 5.0],
            [1.0, 0.0, 1.0f64],
        ];
        assert!(check_factorization(&a) == Err(QrError::Singular { column: 1 }));
    }

    #[test]
    fn zero_last_diagonal() {
        let a = mat![[1.0, 0.0], [0.0, 0.0f64]];
        assert!(check_factorization(&a) == Err(QrError::Singular { column: 1 }));
    }
}
