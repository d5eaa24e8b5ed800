//! Strided matrix views and the owning column-major matrix.
//!
//! A view is a pointer together with a shape and a stride per dimension, so that submatrices and
//! transposes are represented without copying. Strides are counted in elements. The byte "line
//! width" of a row-major buffer corresponds to `row_stride * size_of::<E>()`, see
//! [`from_row_major_slice_with_line_width`].

use crate::assert;
use core::{marker::PhantomData, ptr::NonNull};
use reborrow::*;

#[repr(C)]
struct MatImpl<E> {
    ptr: NonNull<E>,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
}

unsafe impl<E: Sync> Sync for MatImpl<E> {}
unsafe impl<E: Send> Send for MatImpl<E> {}

impl<E> Copy for MatImpl<E> {}
impl<E> Clone for MatImpl<E> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> MatImpl<E> {
    #[inline(always)]
    fn overflowing_ptr_at(&self, row: usize, col: usize) -> *mut E {
        self.ptr.as_ptr().wrapping_offset(
            (row as isize)
                .wrapping_mul(self.row_stride)
                .wrapping_add((col as isize).wrapping_mul(self.col_stride)),
        )
    }
}

#[track_caller]
#[inline]
fn from_slice_assert(nrows: usize, ncols: usize, len: usize) {
    let size = usize::checked_mul(nrows, ncols).unwrap_or(usize::MAX);
    assert!(size == len);
}

#[track_caller]
#[inline]
fn from_strided_row_major_slice_assert(nrows: usize, ncols: usize, row_stride: usize, len: usize) {
    if nrows == 0 || ncols == 0 {
        return;
    }
    let last = usize::checked_mul(row_stride, nrows - 1)
        .and_then(|last_row| last_row.checked_add(ncols - 1))
        .unwrap_or(usize::MAX);
    assert!(all(row_stride >= ncols, last < len));
}

/// Converts a line width in bytes to a row stride in elements.
#[track_caller]
#[inline]
fn line_width_to_stride<E>(ncols: usize, line_width: usize) -> usize {
    let size = core::mem::size_of::<E>();
    assert!(size > 0);
    assert!(line_width % size == 0);
    let row_stride = line_width / size;
    assert!(row_stride >= ncols);
    row_stride
}

mod matref;
pub use matref::{
    from_column_major_slice, from_raw_parts, from_row_major_slice,
    from_row_major_slice_with_line_width, MatRef,
};

mod matmut;
pub use matmut::{
    from_column_major_slice_mut, from_raw_parts_mut, from_row_major_slice_mut,
    from_row_major_slice_with_line_width_mut, MatMut,
};

mod matown;
pub use matown::Mat;

struct DebugRow<'a, E>(MatRef<'a, E>);

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for DebugRow<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let row = self.0;
        f.debug_list()
            .entries((0..row.ncols()).map(|j| row.read(0, j)))
            .finish()
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for MatRef<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let this = *self;
        f.debug_list()
            .entries((0..this.nrows()).map(|i| DebugRow(this.subrows(i, 1))))
            .finish()
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for MatMut<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.rb().fmt(f)
    }
}

impl<E: Copy + core::fmt::Debug> core::fmt::Debug for Mat<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl<E: Copy + PartialEq> PartialEq<MatRef<'_, E>> for MatRef<'_, E> {
    fn eq(&self, other: &MatRef<'_, E>) -> bool {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return false;
        }
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                if self.read(i, j) != other.read(i, j) {
                    return false;
                }
            }
        }
        true
    }
}

impl<E: Copy + PartialEq> PartialEq<MatRef<'_, E>> for Mat<E> {
    fn eq(&self, other: &MatRef<'_, E>) -> bool {
        self.as_ref() == *other
    }
}

impl<E: Copy + PartialEq> PartialEq<Mat<E>> for MatRef<'_, E> {
    fn eq(&self, other: &Mat<E>) -> bool {
        *self == other.as_ref()
    }
}

impl<E: Copy + PartialEq> PartialEq for Mat<E> {
    fn eq(&self, other: &Mat<E>) -> bool {
        self.as_ref() == other.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert, mat};

    #[test]
    fn strided_views() {
        let data = [1.0, 2.0, 3.0, f64::NAN, 4.0, 5.0, 6.0, f64::NAN];
        let view = from_row_major_slice_with_line_width(&data, 2, 3, 4 * core::mem::size_of::<f64>());

        assert!(view.row_stride() == 4);
        assert!(view.col_stride() == 1);
        assert!(view == mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert!(view.transpose() == mat![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);

        let (top_left, top_right, bot_left, bot_right) = view.split_at(1, 2);
        assert!(top_left == mat![[1.0, 2.0]]);
        assert!(top_right == mat![[3.0]]);
        assert!(bot_left == mat![[4.0, 5.0]]);
        assert!(bot_right == mat![[6.0]]);

        assert!(view.submatrix(0, 1, 2, 2) == mat![[2.0, 3.0], [5.0, 6.0]]);
        assert!(view.col(2) == mat![[3.0], [6.0]]);
    }

    #[test]
    #[should_panic]
    fn line_width_too_small() {
        let data = [0.0; 6];
        from_row_major_slice_with_line_width(&data, 2, 3, 2 * core::mem::size_of::<f64>());
    }

    #[test]
    #[should_panic]
    fn line_width_not_a_multiple_of_element_size() {
        let data = [0.0; 8];
        from_row_major_slice_with_line_width(&data, 2, 3, 25);
    }

    #[test]
    fn mutation_through_views() {
        let mut data = [0.0; 8];
        {
            let mut view = from_row_major_slice_with_line_width_mut(&mut data, 2, 3, 32);
            view.write(0, 0, 1.0);
            view.write(1, 2, 6.0);
            view.rb_mut().transpose_mut().write(1, 0, 2.0);
            view.swap_rows(0, 1);
        }
        assert!(data == [0.0, 0.0, 6.0, 0.0, 1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn owned_matrix() {
        let mut m = Mat::<f64>::zeros(3, 2);
        m[(2, 1)] = 4.0;
        m.write(0, 0, 1.0);
        assert!(m.read(2, 1) == 4.0);
        assert!(m == mat![[1.0, 0.0], [0.0, 0.0], [0.0, 4.0]]);

        let id = Mat::<f64>::identity(2, 3);
        assert!(id == mat![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

        let mut copy = Mat::<f64>::zeros(2, 3);
        copy.as_mut().copy_from(id.as_ref());
        assert!(copy == id);

        let empty = Mat::<f64>::default();
        assert!(all(empty.nrows() == 0, empty.ncols() == 0));
        assert!(empty == Mat::<f64>::new());
    }
}
