//! The $LU$ decomposition of a square matrix $A$ is such that:
//! $$PA = LU,$$
//! where $P$ is a permutation matrix, $L$ is a unit lower triangular matrix, and $U$ is
//! an upper triangular matrix.

pub mod partial_pivoting;

/// This error signifies that a linear system could not be solved, or a matrix could not be
/// decomposed or inverted, because the matrix is numerically singular.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LuError {
    /// No acceptable pivot was found while eliminating the given column.
    Singular {
        /// Index of the column (or elimination step) at which the failure was detected.
        column: usize,
    },
}

impl core::fmt::Display for LuError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for LuError {}
