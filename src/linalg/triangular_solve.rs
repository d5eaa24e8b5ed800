//! Triangular solve module.

use crate::{
    assert,
    linalg::matmul::matmul,
    mat::{MatMut, MatRef},
};
use reborrow::*;

#[inline]
fn recursion_threshold() -> usize {
    16
}

#[inline]
fn blocksize(n: usize) -> usize {
    n / 2
}

unsafe fn solve_lower_base_case(tril: MatRef<'_, f64>, rhs: MatMut<'_, f64>, unit: bool) {
    let mut rhs = rhs;
    let n = tril.nrows();
    for j in 0..rhs.ncols() {
        for i in 0..n {
            let mut x = rhs.read_unchecked(i, j);
            for k in 0..i {
                x -= tril.read_unchecked(i, k) * rhs.read_unchecked(k, j);
            }
            if !unit {
                x /= tril.read_unchecked(i, i);
            }
            rhs.write_unchecked(i, j, x);
        }
    }
}

unsafe fn solve_upper_base_case(triu: MatRef<'_, f64>, rhs: MatMut<'_, f64>, unit: bool) {
    let mut rhs = rhs;
    let n = triu.nrows();
    for j in 0..rhs.ncols() {
        for i in (0..n).rev() {
            let mut x = rhs.read_unchecked(i, j);
            for k in i + 1..n {
                x -= triu.read_unchecked(i, k) * rhs.read_unchecked(k, j);
            }
            if !unit {
                x /= triu.read_unchecked(i, i);
            }
            rhs.write_unchecked(i, j, x);
        }
    }
}

fn solve_lower_impl(tril: MatRef<'_, f64>, rhs: MatMut<'_, f64>, unit: bool) {
    let n = tril.nrows();
    if n <= recursion_threshold() {
        unsafe { solve_lower_base_case(tril, rhs, unit) };
        return;
    }

    let bs = blocksize(n);
    let (tril_top_left, _, tril_bot_left, tril_bot_right) = tril.split_at(bs, bs);
    let (mut rhs_top, mut rhs_bot) = rhs.split_at_row_mut(bs);

    //  (A00    )   X0     (B0)
    //  (A10 A11)   X1  =  (B1)
    //
    // 1. A00 X0 = B0
    // 2. A11 X1 = B1 - A10 X0
    solve_lower_impl(tril_top_left, rhs_top.rb_mut(), unit);
    matmul(
        rhs_bot.rb_mut(),
        tril_bot_left,
        rhs_top.into_const(),
        Some(1.0),
        -1.0,
    );
    solve_lower_impl(tril_bot_right, rhs_bot, unit);
}

fn solve_upper_impl(triu: MatRef<'_, f64>, rhs: MatMut<'_, f64>, unit: bool) {
    let n = triu.nrows();
    if n <= recursion_threshold() {
        unsafe { solve_upper_base_case(triu, rhs, unit) };
        return;
    }

    let bs = blocksize(n);
    let (triu_top_left, triu_top_right, _, triu_bot_right) = triu.split_at(bs, bs);
    let (mut rhs_top, mut rhs_bot) = rhs.split_at_row_mut(bs);

    solve_upper_impl(triu_bot_right, rhs_bot.rb_mut(), unit);
    matmul(
        rhs_top.rb_mut(),
        triu_top_right,
        rhs_bot.into_const(),
        Some(1.0),
        -1.0,
    );
    solve_upper_impl(triu_top_left, rhs_top, unit);
}

/// Computes the solution of `triangular_lower × X = rhs`, and stores the result in `rhs`.
///
/// `triangular_lower` is interpreted as a unit lower triangular matrix. Its diagonal and strictly
/// upper triangular part are not accessed.
///
/// # Panics
///  - Panics if `triangular_lower` is not a square matrix.
///  - Panics if `rhs.nrows() != triangular_lower.ncols()`
#[track_caller]
pub fn solve_unit_lower_triangular_in_place(
    triangular_lower: MatRef<'_, f64>,
    rhs: MatMut<'_, f64>,
) {
    assert!(all(
        triangular_lower.nrows() == triangular_lower.ncols(),
        rhs.nrows() == triangular_lower.ncols(),
    ));
    solve_lower_impl(triangular_lower, rhs, true);
}

/// Computes the solution of `triangular_lower × X = rhs`, and stores the result in `rhs`.
///
/// `triangular_lower` is interpreted as a lower triangular matrix (diagonal included). Its
/// strictly upper triangular part is not accessed.
///
/// # Panics
///  - Panics if `triangular_lower` is not a square matrix.
///  - Panics if `rhs.nrows() != triangular_lower.ncols()`
#[track_caller]
pub fn solve_lower_triangular_in_place(triangular_lower: MatRef<'_, f64>, rhs: MatMut<'_, f64>) {
    assert!(all(
        triangular_lower.nrows() == triangular_lower.ncols(),
        rhs.nrows() == triangular_lower.ncols(),
    ));
    solve_lower_impl(triangular_lower, rhs, false);
}

/// Computes the solution of `triangular_upper × X = rhs`, and stores the result in `rhs`.
///
/// `triangular_upper` is interpreted as an upper triangular matrix (diagonal included). Its
/// strictly lower triangular part is not accessed.
///
/// # Panics
///  - Panics if `triangular_upper` is not a square matrix.
///  - Panics if `rhs.nrows() != triangular_upper.ncols()`
#[track_caller]
pub fn solve_upper_triangular_in_place(triangular_upper: MatRef<'_, f64>, rhs: MatMut<'_, f64>) {
    assert!(all(
        triangular_upper.nrows() == triangular_upper.ncols(),
        rhs.nrows() == triangular_upper.ncols(),
    ));
    solve_upper_impl(triangular_upper, rhs, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat::Mat};
    use assert_approx_eq::assert_approx_eq;

    fn random_triangular(n: usize, lower: bool) -> Mat<f64> {
        Mat::from_fn(n, n, |i, j| {
            if i == j {
                2.0 + rand::random::<f64>()
            } else if (i > j) == lower {
                rand::random::<f64>() / n as f64
            } else {
                f64::NAN
            }
        })
    }

    #[test]
    fn test_lower_and_upper() {
        for n in [1, 5, 16, 17, 40] {
            let k = 3;
            let rhs = Mat::from_fn(n, k, |_, _| rand::random::<f64>());

            let lower = random_triangular(n, true);
            let mut sol = rhs.clone();
            solve_lower_triangular_in_place(lower.as_ref(), sol.as_mut());
            for j in 0..k {
                for i in 0..n {
                    let x: f64 = (0..=i).map(|p| lower.read(i, p) * sol.read(p, j)).sum();
                    assert_approx_eq!(x, rhs.read(i, j), 1e-10);
                }
            }

            let mut sol = rhs.clone();
            solve_unit_lower_triangular_in_place(lower.as_ref(), sol.as_mut());
            for j in 0..k {
                for i in 0..n {
                    let x: f64 = sol.read(i, j)
                        + (0..i).map(|p| lower.read(i, p) * sol.read(p, j)).sum::<f64>();
                    assert_approx_eq!(x, rhs.read(i, j), 1e-10);
                }
            }

            let upper = random_triangular(n, false);
            let mut sol = rhs.clone();
            solve_upper_triangular_in_place(upper.as_ref(), sol.as_mut());
            for j in 0..k {
                for i in 0..n {
                    let x: f64 = (i..n).map(|p| upper.read(i, p) * sol.read(p, j)).sum();
                    assert_approx_eq!(x, rhs.read(i, j), 1e-10);
                }
            }
        }
    }
}
