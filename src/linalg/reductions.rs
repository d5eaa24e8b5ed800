//! Matrix reductions.

use crate::{assert, mat::MatRef};

/// Returns the largest absolute value among the elements of `mat`, or zero if it is empty.
///
/// NaN elements are ignored.
pub fn norm_max(mat: MatRef<'_, f64>) -> f64 {
    let mut max = 0.0f64;
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let x = unsafe { mat.read_unchecked(i, j) }.abs();
            if x > max {
                max = x;
            }
        }
    }
    max
}

/// Returns the Euclidean norm of the elements of `mat`.
///
/// The sum of squares is accumulated relative to a running scale, so the result does not
/// overflow or underflow when the norm itself is representable.
pub fn norm_l2(mat: MatRef<'_, f64>) -> f64 {
    let mut scale = 0.0f64;
    let mut ssq = 1.0f64;
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let x = unsafe { mat.read_unchecked(i, j) };
            if x != 0.0 {
                let abs = x.abs();
                if scale < abs {
                    let r = scale / abs;
                    ssq = 1.0 + ssq * r * r;
                    scale = abs;
                } else {
                    let r = abs / scale;
                    ssq += r * r;
                }
            }
        }
    }
    scale * ssq.sqrt()
}

/// Returns the sum of the elementwise products of two matrices of the same shape.
#[track_caller]
pub fn dot(lhs: MatRef<'_, f64>, rhs: MatRef<'_, f64>) -> f64 {
    assert!(all(lhs.nrows() == rhs.nrows(), lhs.ncols() == rhs.ncols()));
    let mut acc = 0.0;
    for j in 0..lhs.ncols() {
        for i in 0..lhs.nrows() {
            acc += unsafe { lhs.read_unchecked(i, j) * rhs.read_unchecked(i, j) };
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn reductions() {
        let m = mat![[1.0, -7.0], [3.0, 4.0f64]];
        assert!(norm_max(m.as_ref()) == 7.0);
        assert_approx_eq!(norm_l2(m.as_ref()), 75.0f64.sqrt());
        assert_approx_eq!(dot(m.as_ref(), m.as_ref()), 75.0);
        assert!(norm_max(m.as_ref().submatrix(0, 0, 0, 0)) == 0.0);
    }

    #[test]
    fn norm_l2_extreme_values() {
        let big = mat![[1e300], [1e300f64]];
        assert_approx_eq!(norm_l2(big.as_ref()) / 1e300, 2.0f64.sqrt());

        let small = mat![[3e-300], [4e-300f64]];
        assert_approx_eq!(norm_l2(small.as_ref()) / 1e-300, 5.0);
    }
}
