//! Linear algebra module.
//!
//! Contains the low level routines and the implementation of their corresponding high level
//! wrappers.
//!
//! # Memory allocation
//! Most algorithms defer memory allocation to the user. Routines that need temporary space for
//! intermediate computations take a [`stack: PodStack`](dyn_stack::PodStack) parameter, a thin
//! wrapper over a slice of memory bytes that may come from any valid source. Each of them has a
//! corresponding function with a similar name ending in `_req` that returns the memory
//! requirements of the algorithm, for example [`qr::no_pivoting::compute::qr_in_place`] and
//! [`qr::no_pivoting::compute::qr_in_place_req`].
//!
//! Requirements combine with [`dyn_stack::StackReq::try_all_of`] (regions used at the same time)
//! and [`dyn_stack::StackReq::try_any_of`] (regions used one after the other), so that a single
//! buffer created once with [`dyn_stack::GlobalPodBuffer::new`] can serve repeated calls. Scratch
//! regions are borrowed from the stack for the duration of a call and handed back on every exit
//! path, including early error returns.
//!
//! # Failures
//! Numerical failures (a singular matrix, a matrix that is not positive definite, an SVD that
//! fails to converge) are reported through the `Result` returned by each routine. Output buffers
//! may be partially written when an error is returned. Dimension mismatches are programming
//! errors and panic.

use crate::mat::{self, MatMut};
use dyn_stack::{PodStack, SizeOverflow, StackReq};

pub mod mat_ops;
pub mod matmul;
pub mod reductions;

pub mod householder;
pub mod triangular_solve;

pub mod cholesky;
pub mod gauss_jordan;
pub mod lu;
pub mod qr;
pub mod svd;

/// High level linear system solvers.
pub mod solvers;

pub(crate) const CACHELINE_ALIGN: usize = 64;

#[inline]
fn col_stride(nrows: usize) -> usize {
    let per_line = CACHELINE_ALIGN / core::mem::size_of::<f64>();
    if nrows >= per_line {
        (nrows + per_line - 1) / per_line * per_line
    } else {
        nrows.max(1)
    }
}

/// Returns the stack requirements for creating a temporary matrix with the given dimensions.
#[inline]
pub fn temp_mat_req(nrows: usize, ncols: usize) -> Result<StackReq, SizeOverflow> {
    let alloc_size = ncols.checked_mul(col_stride(nrows)).ok_or(SizeOverflow)?;
    StackReq::try_new_aligned::<f64>(alloc_size, CACHELINE_ALIGN)
}

/// Creates a temporary matrix of untouched values, from the given memory stack.
pub fn temp_mat_uninit(
    nrows: usize,
    ncols: usize,
    stack: PodStack<'_>,
) -> (MatMut<'_, f64>, PodStack<'_>) {
    let col_stride = col_stride(nrows);
    let alloc_size = ncols * col_stride;
    let (alloc, stack) = stack.make_aligned_raw::<f64>(alloc_size, CACHELINE_ALIGN);
    (
        unsafe {
            mat::from_raw_parts_mut(alloc.as_mut_ptr(), nrows, ncols, 1, col_stride as isize)
        },
        stack,
    )
}

/// Creates a temporary matrix of zero values, from the given memory stack.
pub fn temp_mat_zeroed(
    nrows: usize,
    ncols: usize,
    stack: PodStack<'_>,
) -> (MatMut<'_, f64>, PodStack<'_>) {
    let (mut mat, stack) = temp_mat_uninit(nrows, ncols, stack);
    mat.fill_zero();
    (mat, stack)
}

/// Returns the stack requirements for a temporary vector of `n` values of type `T`.
#[inline]
pub(crate) fn temp_vec_req<T>(n: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<T>(n)
}
