//! The SVD of a matrix $A$ of shape $(m, n)$ is a decomposition into three components $U$, $S$,
//! and $V$, such that:
//!
//! - $U$ has shape $(m, n)$ and has orthonormal columns when $m \geq n$,
//! - $V$ has shape $(n, n)$ and is an orthogonal matrix,
//! - $S$ is a diagonal matrix of shape $(n, n)$ with non negative diagonal elements,
//! - and finally:
//!
//! $$A = U S V^\top.$$
//!
//! The decomposition is computed in three phases. The matrix is first reduced to upper
//! bidiagonal form by alternating Householder reflections from the left and the right. The
//! reflections are then accumulated into $V$ and, in place of the input matrix, into $U$.
//! Finally, the bidiagonal matrix is diagonalized by implicitly shifted QR sweeps, whose Givens
//! rotations are applied to $U$ and $V$ as well.
//!
//! Unless [`SvdParams::sort_singular_values`] is set, the singular values are left in the order in
//! which the diagonalization produced them, which is not sorted in general.

use crate::{
    assert,
    linalg::temp_vec_req,
    mat::{MatMut, MatRef},
    progress::Progress,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Computing the pseudoinverse of a matrix from its SVD.
pub mod pseudo_inverse;

/// This error signifies that the diagonalization did not converge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SvdError {
    /// The QR sweeps on the bidiagonal matrix ran out of iterations.
    NoConvergence {
        /// Index of the singular value that failed to converge.
        index: usize,
    },
}

impl core::fmt::Display for SvdError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for SvdError {}

/// SVD tuning parameters.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub struct SvdParams {
    /// Maximum number of QR sweeps spent on each singular value.
    pub max_iterations: usize,
    /// Whether the singular values are sorted in decreasing order, along with the columns of $U$
    /// and $V$, once the decomposition is done.
    pub sort_singular_values: bool,
}

impl Default for SvdParams {
    #[inline]
    fn default() -> Self {
        Self {
            max_iterations: 75,
            sort_singular_values: false,
        }
    }
}

#[inline(always)]
fn sign(magnitude: f64, sign_of: f64) -> f64 {
    if sign_of >= 0.0 {
        magnitude.abs()
    } else {
        -magnitude.abs()
    }
}

// Reduces `a` to upper bidiagonal form. The diagonal is stored in `w` and the superdiagonal in
// `rv1[1..]`, with `rv1[0] == 0.0`. The left reflections are kept in the columns of `a` from the
// diagonal down, and the right reflections in its rows right of the superdiagonal. Returns the
// largest `|w[i]| + |rv1[i]|`, used as the reference magnitude of the convergence tests.
unsafe fn bidiagonalize(a: MatMut<'_, f64>, w: &mut [f64], rv1: &mut [f64]) -> f64 {
    let mut a = a;
    let m = a.nrows();
    let n = a.ncols();

    let mut g = 0.0f64;
    let mut scale = 0.0f64;
    let mut anorm = 0.0f64;

    for i in 0..n {
        let l = i + 1;
        rv1[i] = scale * g;
        g = 0.0;
        scale = 0.0;

        if i < m {
            for k in i..m {
                scale += a.read_unchecked(k, i).abs();
            }
            if scale != 0.0 {
                let mut s = 0.0;
                for k in i..m {
                    let x = a.read_unchecked(k, i) / scale;
                    a.write_unchecked(k, i, x);
                    s += x * x;
                }
                let f = a.read_unchecked(i, i);
                g = -sign(s.sqrt(), f);
                let h = f * g - s;
                a.write_unchecked(i, i, f - g);
                for j in l..n {
                    let mut s = 0.0;
                    for k in i..m {
                        s += a.read_unchecked(k, i) * a.read_unchecked(k, j);
                    }
                    let f = s / h;
                    for k in i..m {
                        let x = a.read_unchecked(k, j) + f * a.read_unchecked(k, i);
                        a.write_unchecked(k, j, x);
                    }
                }
                for k in i..m {
                    a.write_unchecked(k, i, a.read_unchecked(k, i) * scale);
                }
            }
        }
        w[i] = scale * g;

        g = 0.0;
        scale = 0.0;
        if i < m && l < n {
            for k in l..n {
                scale += a.read_unchecked(i, k).abs();
            }
            if scale != 0.0 {
                let mut s = 0.0;
                for k in l..n {
                    let x = a.read_unchecked(i, k) / scale;
                    a.write_unchecked(i, k, x);
                    s += x * x;
                }
                let f = a.read_unchecked(i, l);
                g = -sign(s.sqrt(), f);
                let h = f * g - s;
                a.write_unchecked(i, l, f - g);
                // rv1[l..] is free until the next iterations overwrite it
                for k in l..n {
                    rv1[k] = a.read_unchecked(i, k) / h;
                }
                for j in l..m {
                    let mut s = 0.0;
                    for k in l..n {
                        s += a.read_unchecked(j, k) * a.read_unchecked(i, k);
                    }
                    for k in l..n {
                        let x = a.read_unchecked(j, k) + s * rv1[k];
                        a.write_unchecked(j, k, x);
                    }
                }
                for k in l..n {
                    a.write_unchecked(i, k, a.read_unchecked(i, k) * scale);
                }
            }
        }

        anorm = anorm.max(w[i].abs() + rv1[i].abs());
    }

    anorm
}

// Accumulates the right reflections stored in the rows of `a` into `v`, last one first.
unsafe fn accumulate_right(a: MatRef<'_, f64>, v: MatMut<'_, f64>, rv1: &[f64]) {
    let mut v = v;
    let n = a.ncols();

    for i in (0..n).rev() {
        let l = i + 1;
        if l < n {
            let g = rv1[l];
            if g != 0.0 {
                // double division to avoid underflow
                for j in l..n {
                    v.write_unchecked(j, i, (a.read_unchecked(i, j) / a.read_unchecked(i, l)) / g);
                }
                for j in l..n {
                    let mut s = 0.0;
                    for k in l..n {
                        s += a.read_unchecked(i, k) * v.read_unchecked(k, j);
                    }
                    for k in l..n {
                        let x = v.read_unchecked(k, j) + s * v.read_unchecked(k, i);
                        v.write_unchecked(k, j, x);
                    }
                }
            }
            for j in l..n {
                v.write_unchecked(i, j, 0.0);
                v.write_unchecked(j, i, 0.0);
            }
        }
        v.write_unchecked(i, i, 1.0);
    }
}

// Overwrites `a` with the product of the left reflections stored in its columns.
unsafe fn accumulate_left(a: MatMut<'_, f64>, w: &[f64]) {
    let mut a = a;
    let m = a.nrows();
    let n = a.ncols();

    for i in (0..Ord::min(m, n)).rev() {
        let l = i + 1;
        for j in l..n {
            a.write_unchecked(i, j, 0.0);
        }
        let g = w[i];
        if g != 0.0 {
            let g = 1.0 / g;
            for j in l..n {
                let mut s = 0.0;
                for k in l..m {
                    s += a.read_unchecked(k, i) * a.read_unchecked(k, j);
                }
                let f = (s / a.read_unchecked(i, i)) * g;
                for k in i..m {
                    let x = a.read_unchecked(k, j) + f * a.read_unchecked(k, i);
                    a.write_unchecked(k, j, x);
                }
            }
            for j in i..m {
                a.write_unchecked(j, i, a.read_unchecked(j, i) * g);
            }
        } else {
            for j in i..m {
                a.write_unchecked(j, i, 0.0);
            }
        }
        a.write_unchecked(i, i, a.read_unchecked(i, i) + 1.0);
    }
}

// Applies the plane rotation `[c s; -s c]` to the columns `j` and `i` of `mat`.
#[inline(always)]
unsafe fn rotate_cols(mat: MatMut<'_, f64>, j: usize, i: usize, c: f64, s: f64) {
    let mut mat = mat;
    for r in 0..mat.nrows() {
        let y = mat.read_unchecked(r, j);
        let z = mat.read_unchecked(r, i);
        mat.write_unchecked(r, j, y * c + z * s);
        mat.write_unchecked(r, i, z * c - y * s);
    }
}

// Diagonalizes the bidiagonal matrix `(w, rv1)`, from the last singular value to the first,
// applying the rotations to `u` and `v`.
unsafe fn diagonalize(
    u: MatMut<'_, f64>,
    v: MatMut<'_, f64>,
    w: &mut [f64],
    rv1: &mut [f64],
    anorm: f64,
    max_iterations: usize,
    progress: &mut Progress<'_>,
) -> Result<(), SvdError> {
    let mut u = u;
    let mut v = v;
    let n = w.len();

    for k in (0..n).rev() {
        let mut iterations = 0;
        loop {
            iterations += 1;

            // look for a negligible superdiagonal element rv1[l] (rv1[0] is always zero), or a
            // negligible diagonal element w[l - 1]
            let mut cancel = true;
            let mut l = k;
            loop {
                if l == 0 || rv1[l].abs() + anorm == anorm {
                    cancel = false;
                    break;
                }
                if w[l - 1].abs() + anorm == anorm {
                    break;
                }
                l -= 1;
            }

            if cancel {
                // w[l - 1] is zero, chase rv1[l] out with rotations from the left
                let nm = l - 1;
                let mut c = 0.0;
                let mut s = 1.0;
                for i in l..=k {
                    let f = s * rv1[i];
                    rv1[i] *= c;
                    if f.abs() + anorm == anorm {
                        break;
                    }
                    let g = w[i];
                    let h = f.hypot(g);
                    w[i] = h;
                    let h = 1.0 / h;
                    c = g * h;
                    s = -f * h;
                    rotate_cols(u.rb_mut(), nm, i, c, s);
                }
            }

            let z = w[k];
            if l == k {
                if z < 0.0 {
                    w[k] = -z;
                    for j in 0..v.nrows() {
                        v.write_unchecked(j, k, -v.read_unchecked(j, k));
                    }
                }
                break;
            }

            if iterations >= max_iterations {
                return Err(SvdError::NoConvergence { index: k });
            }

            // shift from the bottom 2×2 minor
            let nm = k - 1;
            let mut x = w[l];
            let y = w[nm];
            let g = rv1[nm];
            let h = rv1[k];
            let mut f = ((y - z) * (y + z) + (g - h) * (g + h)) / (2.0 * h * y);
            let g = f.hypot(1.0);
            f = ((x - z) * (x + z) + h * ((y / (f + sign(g, f))) - h)) / x;

            // QR sweep
            let mut c = 1.0;
            let mut s = 1.0;
            for j in l..=nm {
                let i = j + 1;
                let mut g = rv1[i];
                let mut y = w[i];
                let mut h = s * g;
                g *= c;

                let mut z = f.hypot(h);
                rv1[j] = z;
                c = f / z;
                s = h / z;
                f = x * c + g * s;
                g = g * c - x * s;
                h = y * s;
                y *= c;
                rotate_cols(v.rb_mut(), j, i, c, s);

                z = f.hypot(h);
                w[j] = z;
                if z != 0.0 {
                    z = 1.0 / z;
                    c = f * z;
                    s = h * z;
                }
                f = c * g + s * y;
                x = c * y - s * g;
                rotate_cols(u.rb_mut(), j, i, c, s);
            }
            rv1[l] = 0.0;
            rv1[k] = f;
            w[k] = x;
        }

        progress.report_fraction(n - k, n);
    }

    Ok(())
}

/// Computes the size and alignment of required workspace for computing the SVD of an `m×n`
/// matrix with [`compute_svd_in_place`].
pub fn compute_svd_req(_m: usize, n: usize) -> Result<StackReq, SizeOverflow> {
    temp_vec_req::<f64>(n)
}

/// Computes the SVD of `matrix` in place.
///
/// On exit, `matrix` holds $U$, `s` holds the singular values and `v` holds $V$ (not its
/// transpose), such that $A = U \operatorname{diag}(s) V^\top$. The singular values are non
/// negative. When `matrix` has more columns than rows, the decomposition is still computed, and at
/// least `n - m` singular values are zero.
///
/// Each singular value is given at most `params.max_iterations` QR sweeps to converge.
///
/// # Errors
/// Returns [`SvdError::NoConvergence`] if a singular value did not converge within its iteration
/// budget. `matrix`, `s` and `v` hold intermediate values in that case.
///
/// # Panics
/// - Panics if `s.len() != matrix.ncols()`.
/// - Panics if `v` is not a square matrix with `matrix.ncols()` rows.
/// - Panics if the provided memory in `stack` is insufficient (see [`compute_svd_req`]).
#[track_caller]
pub fn compute_svd_in_place(
    matrix: MatMut<'_, f64>,
    s: &mut [f64],
    v: MatMut<'_, f64>,
    params: SvdParams,
    stack: PodStack<'_>,
    progress: Progress<'_>,
) -> Result<(), SvdError> {
    let mut a = matrix;
    let mut v = v;
    let mut progress = progress;
    let n = a.ncols();
    assert!(all(s.len() == n, v.nrows() == n, v.ncols() == n));

    crate::__warn_if_not_col_major!(a, SVD_WARN, "Singular value decomposition");

    let (rv1, _) = stack.make_raw::<f64>(n);

    unsafe {
        let anorm = bidiagonalize(a.rb_mut(), s, rv1);
        progress.report(20);
        accumulate_right(a.rb(), v.rb_mut(), rv1);
        accumulate_left(a.rb_mut(), s);
        progress.report(40);
        diagonalize(
            a.rb_mut(),
            v.rb_mut(),
            s,
            rv1,
            anorm,
            params.max_iterations,
            &mut progress.sub(40, 100),
        )?;
    }

    if params.sort_singular_values {
        sort_svd(a, s, v);
    }
    progress.finish();
    Ok(())
}

/// Sorts the singular values in `s` in decreasing order, and permutes the columns of `u` and `v`
/// accordingly.
///
/// # Panics
/// Panics if `u` or `v` do not have `s.len()` columns.
#[track_caller]
pub fn sort_svd(u: MatMut<'_, f64>, s: &mut [f64], v: MatMut<'_, f64>) {
    let mut u = u;
    let mut v = v;
    let n = s.len();
    assert!(all(u.ncols() == n, v.ncols() == n));

    for i in 0..n {
        let mut max_idx = i;
        for j in i + 1..n {
            if s[j] > s[max_idx] {
                max_idx = j;
            }
        }
        if max_idx != i {
            s.swap(i, max_idx);
            u.swap_cols(i, max_idx);
            v.swap_cols(i, max_idx);
        }
    }
}
