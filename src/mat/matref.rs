use super::*;
use crate::{assert, debug_assert};

/// Immutable view over a matrix, similar to an immutable reference to a 2D strided [prim@slice].
#[repr(C)]
pub struct MatRef<'a, E> {
    pub(super) inner: MatImpl<E>,
    pub(super) __marker: PhantomData<&'a E>,
}

impl<E> Clone for MatRef<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for MatRef<'_, E> {}

impl<'short, E> Reborrow<'short> for MatRef<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'short, E> ReborrowMut<'short> for MatRef<'_, E> {
    type Target = MatRef<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        *self
    }
}

impl<E> IntoConst for MatRef<'_, E> {
    type Target = Self;

    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}

impl<'a, E> MatRef<'a, E> {
    #[inline]
    pub(crate) unsafe fn __from_raw_parts(
        ptr: *const E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            inner: MatImpl {
                ptr: NonNull::new_unchecked(ptr as *mut E),
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

    /// Returns pointer to the matrix data.
    #[inline(always)]
    pub fn as_ptr(self) -> *const E {
        self.inner.ptr.as_ptr()
    }

    /// Returns a pointer to the element at the given indices. The indices may be one past the
    /// end of each dimension, in which case the pointer must not be dereferenced.
    #[inline(always)]
    pub fn ptr_at(self, row: usize, col: usize) -> *const E {
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
    pub fn split_at(self, row: usize, col: usize) -> (Self, Self, Self, Self) {
        assert!(all(row <= self.nrows(), col <= self.ncols()));
        let (top, bot) = self.split_at_row(row);
        let (top_left, top_right) = top.split_at_col(col);
        let (bot_left, bot_right) = bot.split_at_col(col);
        (top_left, top_right, bot_left, bot_right)
    }

    /// Splits the matrix horizontally at the given row into top and bottom parts.
    ///
    /// # Panics
    /// The function panics if `row > self.nrows()`.
    #[inline(always)]
    #[track_caller]
    pub fn split_at_row(self, row: usize) -> (Self, Self) {
        assert!(row <= self.nrows());
        let rs = self.row_stride();
        let cs = self.col_stride();
        unsafe {
            (
                Self::__from_raw_parts(self.ptr_at(0, 0), row, self.ncols(), rs, cs),
                Self::__from_raw_parts(
                    self.ptr_at(row, 0),
                    self.nrows() - row,
                    self.ncols(),
                    rs,
                    cs,
                ),
            )
        }
    }

    /// Splits the matrix vertically at the given column into left and right parts.
    ///
    /// # Panics
    /// The function panics if `col > self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn split_at_col(self, col: usize) -> (Self, Self) {
        let (left, right) = self.transpose().split_at_row(col);
        (left.transpose(), right.transpose())
    }

    /// Returns a view over the transpose of `self`.
    #[inline(always)]
    #[must_use]
    pub fn transpose(self) -> Self {
        unsafe {
            Self::__from_raw_parts(
                self.as_ptr(),
                self.ncols(),
                self.nrows(),
                self.col_stride(),
                self.row_stride(),
            )
        }
    }

    /// Returns a view over the submatrix starting at indices `(row_start, col_start)`, and with
    /// dimensions `(nrows, ncols)`.
    ///
    /// # Panics
    /// The function panics if the submatrix does not fit inside `self`.
    #[track_caller]
    #[inline(always)]
    pub fn submatrix(self, row_start: usize, col_start: usize, nrows: usize, ncols: usize) -> Self {
        assert!(all(row_start <= self.nrows(), col_start <= self.ncols()));
        assert!(all(
            nrows <= self.nrows() - row_start,
            ncols <= self.ncols() - col_start,
        ));
        unsafe {
            Self::__from_raw_parts(
                self.ptr_at(row_start, col_start),
                nrows,
                ncols,
                self.row_stride(),
                self.col_stride(),
            )
        }
    }

    /// Returns a view over the rows `row_start..row_start + nrows`.
    #[track_caller]
    #[inline(always)]
    pub fn subrows(self, row_start: usize, nrows: usize) -> Self {
        let ncols = self.ncols();
        self.submatrix(row_start, 0, nrows, ncols)
    }

    /// Returns a view over the columns `col_start..col_start + ncols`.
    #[track_caller]
    #[inline(always)]
    pub fn subcols(self, col_start: usize, ncols: usize) -> Self {
        let nrows = self.nrows();
        self.submatrix(0, col_start, nrows, ncols)
    }

    /// Returns a view over the column at the given index, as an `nrows × 1` matrix.
    #[track_caller]
    #[inline(always)]
    pub fn col(self, col: usize) -> Self {
        assert!(col < self.ncols());
        self.subcols(col, 1)
    }
}

impl<'a, E: Copy> MatRef<'a, E> {
    /// Reads the value of the element at the given indices.
    ///
    /// # Safety
    /// The behavior is undefined if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub unsafe fn read_unchecked(&self, row: usize, col: usize) -> E {
        debug_assert!(all(row < self.nrows(), col < self.ncols()));
        *self.ptr_at(row, col)
    }

    /// Reads the value of the element at the given indices, with bound checks.
    ///
    /// # Panics
    /// The function panics if any of the following conditions are violated:
    /// * `row < self.nrows()`.
    /// * `col < self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, row: usize, col: usize) -> E {
        assert!(all(row < self.nrows(), col < self.ncols()));
        unsafe { self.read_unchecked(row, col) }
    }

    /// Returns an owning [`Mat`] containing a copy of the data.
    pub fn to_owned(&self) -> Mat<E> {
        let this = *self;
        Mat::from_fn(this.nrows(), this.ncols(), |i, j| unsafe {
            this.read_unchecked(i, j)
        })
    }
}

/// Creates a `MatRef` from pointers to the matrix data, dimensions, and strides.
///
/// The row (resp. column) stride is the offset from the memory address of a given matrix
/// element at indices `(row: i, col: j)`, to the memory address of the matrix element at
/// indices `(row: i + 1, col: 0)` (resp. `(row: 0, col: i + 1)`). This offset is specified in
/// number of elements, not in bytes.
///
/// # Safety
/// The behavior is undefined if any of the following conditions are violated:
/// * For each matrix unit, the entire memory region addressed by the matrix must be contained
/// within a single allocation, accessible in its entirety by the corresponding pointer in
/// `ptr`.
/// * For each matrix unit, the corresponding pointer must be properly aligned,
/// even for a zero-sized matrix.
/// * No mutable aliasing is allowed for the lifetime `'a`.
#[inline(always)]
pub unsafe fn from_raw_parts<'a, E>(
    ptr: *const E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
) -> MatRef<'a, E> {
    MatRef::__from_raw_parts(ptr, nrows, ncols, row_stride, col_stride)
}

/// Creates a `MatRef` from a slice in column-major format.
///
/// # Panics
/// The function panics if `nrows * ncols != slice.len()`.
#[track_caller]
#[inline(always)]
pub fn from_column_major_slice<E>(slice: &[E], nrows: usize, ncols: usize) -> MatRef<'_, E> {
    from_slice_assert(nrows, ncols, slice.len());
    unsafe { from_raw_parts(slice.as_ptr(), nrows, ncols, 1, nrows as isize) }
}

/// Creates a `MatRef` from a slice in row-major format.
///
/// # Panics
/// The function panics if `nrows * ncols != slice.len()`.
#[track_caller]
#[inline(always)]
pub fn from_row_major_slice<E>(slice: &[E], nrows: usize, ncols: usize) -> MatRef<'_, E> {
    from_column_major_slice(slice, ncols, nrows).transpose()
}

/// Creates a `MatRef` from a slice in row-major format, where the beginnings of two consecutive
/// rows are `line_width` bytes apart.
///
/// # Panics
/// The function panics if any of the following conditions are violated:
/// * `line_width` is a multiple of `size_of::<E>()`.
/// * `line_width >= ncols * size_of::<E>()`.
/// * the last element of the matrix lies inside `slice`.
#[track_caller]
pub fn from_row_major_slice_with_line_width<E>(
    slice: &[E],
    nrows: usize,
    ncols: usize,
    line_width: usize,
) -> MatRef<'_, E> {
    let row_stride = line_width_to_stride::<E>(ncols, line_width);
    from_strided_row_major_slice_assert(nrows, ncols, row_stride, slice.len());
    unsafe { from_raw_parts(slice.as_ptr(), nrows, ncols, row_stride as isize, 1) }
}
