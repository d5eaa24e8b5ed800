//! `densolve` is a dense linear algebra library for `f64` matrices, operating on strided views.
//!
//! It provides solvers for systems of linear equations, matrix inversion, determinants, and the
//! classical decompositions:
//! - Gauss-Jordan elimination with full pivoting, see [`linalg::gauss_jordan`],
//! - recursive LU decomposition with partial pivoting, see [`linalg::lu::partial_pivoting`],
//! - linear solve with iterative refinement, see [`linalg::lu::partial_pivoting::refine`],
//! - Cholesky decomposition, see [`linalg::cholesky::llt`],
//! - textbook Householder QR, see [`linalg::qr::classic`],
//! - panel blocked Householder QR with explicit Q expansion, see [`linalg::qr::no_pivoting`],
//! - singular value decomposition and the pseudoinverse, see [`linalg::svd`].
//!
//! The low level routines work in place on [`MatMut`] views, take their scratch memory from a
//! [`dyn_stack::PodStack`] sized by the matching `*_req` function, and report advisory progress
//! through a [`Progress`]. The owning wrappers in [`linalg::solvers`] allocate everything
//! themselves.
//!
//! ```
//! use densolve::mat;
//!
//! let a = mat![[4.0, 1.0], [1.0, 3.0f64]];
//! let b = mat![[1.0], [2.0f64]];
//!
//! let lu = a.partial_piv_lu().unwrap();
//! let x = lu.solve(b.as_ref());
//!
//! let r = &(&a * &x) - &b;
//! assert!(r.read(0, 0).abs() < 1e-12);
//! assert!(r.read(1, 0).abs() < 1e-12);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(non_snake_case)]

use equator::{assert, debug_assert};

extern crate alloc;

pub use dyn_stack;
pub use reborrow;

pub mod linalg;
pub mod mat;
pub mod progress;

pub use mat::{Mat, MatMut, MatRef};
pub use progress::Progress;

/// Creates a [`Mat`] containing the arguments, given row by row.
///
/// ```
/// use densolve::mat;
///
/// let matrix = mat![
///     [1.0, 5.0, 9.0],
///     [2.0, 6.0, 10.0],
///     [3.0, 7.0, 11.0],
///     [4.0, 8.0, 12.0f64],
/// ];
///
/// assert_eq!(matrix.read(0, 0), 1.0);
/// assert_eq!(matrix.read(3, 0), 4.0);
/// assert_eq!(matrix.read(0, 2), 9.0);
/// assert_eq!(matrix.read(3, 2), 12.0);
/// ```
#[macro_export]
macro_rules! mat {
    () => {
        {
            compile_error!("number of columns in the matrix is ambiguous");
        }
    };

    ($([$($v:expr),* $(,)?] ),* $(,)?) => {
        {
            let data = [$([$($v),*]),*];
            let nrows = data.len();
            let ncols = data[0].len();
            $crate::mat::Mat::from_fn(nrows, ncols, |i, j| data[i][j])
        }
    };
}

#[cfg(feature = "perf-warn")]
#[macro_export]
#[doc(hidden)]
macro_rules! __perf_warn {
    ($name: ident) => {{
        #[inline(always)]
        #[allow(non_snake_case)]
        fn $name() -> &'static ::core::sync::atomic::AtomicBool {
            static $name: ::core::sync::atomic::AtomicBool =
                ::core::sync::atomic::AtomicBool::new(false);
            &$name
        }
        ::core::matches!(
            $name().compare_exchange(
                false,
                true,
                ::core::sync::atomic::Ordering::Relaxed,
                ::core::sync::atomic::Ordering::Relaxed,
            ),
            Ok(_)
        )
    }};
}

/// Emits a one-time warning when `$matrix` is not stored in column-major order.
#[cfg(feature = "perf-warn")]
#[doc(hidden)]
#[macro_export]
macro_rules! __warn_if_not_col_major {
    ($matrix: expr, $name: ident, $what: literal) => {{
        if $matrix.row_stride().unsigned_abs() != 1
            && $matrix.nrows() > 1
            && $crate::__perf_warn!($name)
        {
            if $matrix.col_stride().unsigned_abs() == 1 {
                log::warn!(target: "densolve_perf", "{} prefers column-major matrix. Found row-major matrix.", $what);
            } else {
                log::warn!(target: "densolve_perf", "{} prefers column-major matrix. Found matrix with generic strides.", $what);
            }
        }
    }};
}

#[cfg(not(feature = "perf-warn"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __warn_if_not_col_major {
    ($matrix: expr, $name: ident, $what: literal) => {{
        let _ = &$matrix;
    }};
}
