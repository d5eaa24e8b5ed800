use super::*;
use crate::{assert, debug_assert};

/// Mutable view over a matrix, similar to a mutable reference to a 2D strided [prim@slice].
///
/// # Move semantics
/// Since `MatMut` mutably borrows data, it cannot be [`Copy`]. Passing it by value to a function
/// renders the original variable unusable, so callers that need it afterwards pass
/// [`ReborrowMut::rb_mut`] instead, or [`Reborrow::rb`] to obtain a [`MatRef`] for the lifetime
/// of the borrow.
#[repr(C)]
pub struct MatMut<'a, E> {
    pub(super) inner: MatImpl<E>,
    pub(super) __marker: PhantomData<&'a mut E>,
}

impl<'short, E> Reborrow<'short> for MatMut<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        MatRef {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'short, E> ReborrowMut<'short> for MatMut<'_, E> {
    type Target = MatMut<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        MatMut {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'a, E> IntoConst for MatMut<'a, E> {
    type Target = MatRef<'a, E>;

    #[inline]
    fn into_const(self) -> Self::Target {
        MatRef {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'a, E> MatMut<'a, E> {
    #[inline]
    pub(crate) unsafe fn __from_raw_parts(
        ptr: *mut E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            inner: MatImpl {
                ptr: NonNull::new_unchecked(ptr),
                nrows,
                ncols,
                row_stride,
                col_stride,
            },
            __marker: PhantomData,
        }
    }

    /// Returns the number of rows of the matrix.
    #[inline(always)]
    pub fn nrows(&self) -> usize {
        self.inner.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline(always)]
    pub fn ncols(&self) -> usize {
        self.inner.ncols
    }

    /// Returns the offset between the first elements of two successive rows in the matrix.
    #[inline(always)]
    pub fn row_stride(&self) -> isize {
        self.inner.row_stride
    }

    /// Returns the offset between the first elements of two successive columns in the matrix.
    #[inline(always)]
    pub fn col_stride(&self) -> isize {
        self.inner.col_stride
    }

    /// Returns a mutable pointer to the matrix data.
    #[inline(always)]
    pub fn as_ptr_mut(self) -> *mut E {
        self.inner.ptr.as_ptr()
    }

    /// Returns a mutable pointer to the element at the given indices. The indices may be one past
    /// the end of each dimension, in which case the pointer must not be dereferenced.
    #[inline(always)]
    pub fn ptr_at_mut(self, row: usize, col: usize) -> *mut E {
        self.inner.overflowing_ptr_at(row, col)
    }

    /// Splits the matrix into four corner parts, in the following order: top left, top right,
    /// bottom left, bottom right.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row <= self.nrows()`.
    /// * `col <= self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn split_at_mut(self, row: usize, col: usize) -> (Self, Self, Self, Self) {
        let (top_left, top_right, bot_left, bot_right) = self.into_const().split_at(row, col);
        unsafe {
            (
                top_left.const_cast(),
                top_right.const_cast(),
                bot_left.const_cast(),
                bot_right.const_cast(),
            )
        }
    }

    /// Splits the matrix horizontally at the given row into top and bottom parts.
    #[inline(always)]
    #[track_caller]
    pub fn split_at_row_mut(self, row: usize) -> (Self, Self) {
        let (top, bot) = self.into_const().split_at_row(row);
        unsafe { (top.const_cast(), bot.const_cast()) }
    }

    /// Splits the matrix vertically at the given column into left and right parts.
    #[inline(always)]
    #[track_caller]
    pub fn split_at_col_mut(self, col: usize) -> (Self, Self) {
        let (left, right) = self.into_const().split_at_col(col);
        unsafe { (left.const_cast(), right.const_cast()) }
    }

    /// Returns a view over the transpose of `self`.
    #[inline(always)]
    #[must_use]
    pub fn transpose_mut(self) -> Self {
        unsafe { self.into_const().transpose().const_cast() }
    }

    /// Returns a view over the submatrix starting at indices `(row_start, col_start)`, and with
    /// dimensions `(nrows, ncols)`.
    #[track_caller]
    #[inline(always)]
    pub fn submatrix_mut(
        self,
        row_start: usize,
        col_start: usize,
        nrows: usize,
        ncols: usize,
    ) -> Self {
        unsafe {
            self.into_const()
                .submatrix(row_start, col_start, nrows, ncols)
                .const_cast()
        }
    }

    /// Returns a view over the rows `row_start..row_start + nrows`.
    #[track_caller]
    #[inline(always)]
    pub fn subrows_mut(self, row_start: usize, nrows: usize) -> Self {
        unsafe { self.into_const().subrows(row_start, nrows).const_cast() }
    }

    /// Returns a view over the columns `col_start..col_start + ncols`.
    #[track_caller]
    #[inline(always)]
    pub fn subcols_mut(self, col_start: usize, ncols: usize) -> Self {
        unsafe { self.into_const().subcols(col_start, ncols).const_cast() }
    }

    /// Returns a view over the column at the given index, as an `nrows × 1` matrix.
    #[track_caller]
    #[inline(always)]
    pub fn col_mut(self, col: usize) -> Self {
        unsafe { self.into_const().col(col).const_cast() }
    }
}

impl<'a, E> MatRef<'a, E> {
    /// # Safety
    /// `self` must not be aliased by any other live view for the lifetime `'a`.
    #[inline(always)]
    pub(crate) unsafe fn const_cast(self) -> MatMut<'a, E> {
        MatMut {
            inner: self.inner,
            __marker: PhantomData,
        }
    }
}

impl<'a, E: Copy> MatMut<'a, E> {
    /// Reads the value of the element at the given indices.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub unsafe fn read_unchecked(&self, row: usize, col: usize) -> E {
        self.rb().read_unchecked(row, col)
    }

    /// Reads the value of the element at the given indices, with bound checks.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E {
        self.rb().read(row, col)
    }

    /// Writes the value to the element at the given indices.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub unsafe fn write_unchecked(&mut self, row: usize, col: usize, value: E) {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        *self.rb_mut().ptr_at_mut(row, col) = value;
    }

    /// Writes the value to the element at the given indices, with bound checks.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn write(&mut self, row: usize, col: usize, value: E) {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.write_unchecked(row, col, value) };
    }

    /// Copies the values from `other` into `self`.
    ///
    /// # Panics
    /// The function panics if the two matrices do not have the same dimensions.
    #[track_caller]
    pub fn copy_from(&mut self, other: MatRef<'_, E>) {
        assert!(all(self.nrows() == other.nrows(), self.ncols() == other.ncols()));
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { self.write_unchecked(i, j, other.read_unchecked(i, j)) };
            }
        }
    }

    /// Fills the elements of `self` with `constant`.
    pub fn fill(&mut self, constant: E) {
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                unsafe { self.write_unchecked(i, j, constant) };
            }
        }
    }

    /// Swaps the rows `a` and `b` in place.
    #[track_caller]
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        assert!(all(a < self.nrows(), b < self.nrows()));
        if a == b {
            return;
        }
        for j in 0..self.ncols() {
            unsafe {
                let tmp = self.read_unchecked(a, j);
                self.write_unchecked(a, j, self.read_unchecked(b, j));
                self.write_unchecked(b, j, tmp);
            }
        }
    }

    /// Swaps the columns `a` and `b` in place.
    #[track_caller]
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        self.rb_mut().transpose_mut().swap_rows(a, b)
    }
}

impl<'a> MatMut<'a, f64> {
    /// Fills the elements of `self` with zeros.
    #[inline]
    pub fn fill_zero(&mut self) {
        self.fill(0.0)
    }
}

/// Creates a `MatMut` from pointers to the matrix data, dimensions, and strides.
///
/// # Safety
/// The behavior is undefined if any of the following conditions are violated:
/// * The entire memory region addressed by the matrix must be contained within a single
/// allocation, accessible in its entirety by `ptr`.
/// * `ptr` must be properly aligned, even for a zero-sized matrix.
/// * No aliasing (including self aliasing) is allowed for the lifetime `'a`.
#[inline(always)]
pub unsafe fn from_raw_parts_mut<'a, E>(
    ptr: *mut E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
) -> MatMut<'a, E> {
    MatMut::__from_raw_parts(ptr, nrows, ncols, row_stride, col_stride)
}

/// Creates a `MatMut` from a slice in column-major format.
///
/// # Panics
/// The function panics if `nrows * ncols != slice.len()`.
#[track_caller]
#[inline(always)]
pub fn from_column_major_slice_mut<E>(
    slice: &mut [E],
    nrows: usize,
    ncols: usize,
) -> MatMut<'_, E> {
    from_slice_assert(nrows, ncols, slice.len());
    unsafe { from_raw_parts_mut(slice.as_mut_ptr(), nrows, ncols, 1, nrows as isize) }
}

/// Creates a `MatMut` from a slice in row-major format.
///
/// # Panics
/// The function panics if `nrows * ncols != slice.len()`.
#[track_caller]
#[inline(always)]
pub fn from_row_major_slice_mut<E>(slice: &mut [E], nrows: usize, ncols: usize) -> MatMut<'_, E> {
    from_column_major_slice_mut(slice, ncols, nrows).transpose_mut()
}

/// Creates a `MatMut` from a slice in row-major format, where the beginnings of two consecutive
/// rows are `line_width` bytes apart.
///
/// # Panics
/// The function panics if any of the following conditions are violated:
/// * `line_width` is a multiple of `size_of::<E>()`.
/// * `line_width >= ncols * size_of::<E>()`.
/// * the last element of the matrix lies inside `slice`.
#[track_caller]
pub fn from_row_major_slice_with_line_width_mut<E>(
    slice: &mut [E],
    nrows: usize,
    ncols: usize,
    line_width: usize,
) -> MatMut<'_, E> {
    let row_stride = line_width_to_stride::<E>(ncols, line_width);
    from_strided_row_major_slice_assert(nrows, ncols, row_stride, slice.len());
    unsafe { from_raw_parts_mut(slice.as_mut_ptr(), nrows, ncols, row_stride as isize, 1) }
}
