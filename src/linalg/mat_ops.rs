//! Elementwise matrix operations and the arithmetic operator implementations.

use crate::{
    assert,
    linalg::matmul,
    mat::{Mat, MatMut, MatRef},
};
use core::ops::{Add, Mul, Neg, Sub};

/// Computes `dst += src`.
#[track_caller]
pub fn add_in_place(dst: MatMut<'_, f64>, src: MatRef<'_, f64>) {
    scale_add_in_place(dst, src, 1.0)
}

/// Computes `dst -= src`.
#[track_caller]
pub fn sub_in_place(dst: MatMut<'_, f64>, src: MatRef<'_, f64>) {
    scale_add_in_place(dst, src, -1.0)
}

/// Computes `dst += alpha * src`.
#[track_caller]
pub fn scale_add_in_place(dst: MatMut<'_, f64>, src: MatRef<'_, f64>, alpha: f64) {
    let mut dst = dst;
    assert!(all(dst.nrows() == src.nrows(), dst.ncols() == src.ncols()));
    for j in 0..dst.ncols() {
        for i in 0..dst.nrows() {
            unsafe {
                let x = dst.read_unchecked(i, j) + alpha * src.read_unchecked(i, j);
                dst.write_unchecked(i, j, x);
            }
        }
    }
}

/// Computes `dst *= alpha`.
pub fn scale_in_place(dst: MatMut<'_, f64>, alpha: f64) {
    let mut dst = dst;
    for j in 0..dst.ncols() {
        for i in 0..dst.nrows() {
            unsafe {
                let x = alpha * dst.read_unchecked(i, j);
                dst.write_unchecked(i, j, x);
            }
        }
    }
}

impl<'a> MatRef<'a, f64> {
    #[track_caller]
    fn add_impl(self, other: MatRef<'_, f64>) -> Mat<f64> {
        let mut out = self.to_owned();
        add_in_place(out.as_mut(), other);
        out
    }

    #[track_caller]
    fn sub_impl(self, other: MatRef<'_, f64>) -> Mat<f64> {
        let mut out = self.to_owned();
        sub_in_place(out.as_mut(), other);
        out
    }

    fn neg_impl(self) -> Mat<f64> {
        let mut out = self.to_owned();
        scale_in_place(out.as_mut(), -1.0);
        out
    }

    #[track_caller]
    fn mul_impl(self, other: MatRef<'_, f64>) -> Mat<f64> {
        assert!(self.ncols() == other.nrows());
        let mut out = Mat::zeros(self.nrows(), other.ncols());
        matmul::matmul(out.as_mut(), self, other, None, 1.0);
        out
    }
}

macro_rules! impl_binop {
    ($lhs: ty, $rhs: ty) => {
        impl Add<$rhs> for $lhs {
            type Output = Mat<f64>;
            #[track_caller]
            fn add(self, other: $rhs) -> Self::Output {
                self.view().add_impl(other.view())
            }
        }

        impl Sub<$rhs> for $lhs {
            type Output = Mat<f64>;
            #[track_caller]
            fn sub(self, other: $rhs) -> Self::Output {
                self.view().sub_impl(other.view())
            }
        }

        impl Mul<$rhs> for $lhs {
            type Output = Mat<f64>;
            #[track_caller]
            fn mul(self, other: $rhs) -> Self::Output {
                self.view().mul_impl(other.view())
            }
        }
    };
}

trait AsView {
    fn view(&self) -> MatRef<'_, f64>;
}

impl AsView for MatRef<'_, f64> {
    #[inline]
    fn view(&self) -> MatRef<'_, f64> {
        *self
    }
}

impl AsView for &Mat<f64> {
    #[inline]
    fn view(&self) -> MatRef<'_, f64> {
        self.as_ref()
    }
}

impl_binop!(MatRef<'_, f64>, MatRef<'_, f64>);
impl_binop!(MatRef<'_, f64>, &Mat<f64>);
impl_binop!(&Mat<f64>, MatRef<'_, f64>);
impl_binop!(&Mat<f64>, &Mat<f64>);

impl Neg for MatRef<'_, f64> {
    type Output = Mat<f64>;
    fn neg(self) -> Self::Output {
        self.neg_impl()
    }
}

impl Neg for &Mat<f64> {
    type Output = Mat<f64>;
    fn neg(self) -> Self::Output {
        self.as_ref().neg_impl()
    }
}
