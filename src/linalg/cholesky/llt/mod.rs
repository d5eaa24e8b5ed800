//! The Cholesky decomposition of a symmetric positive definite matrix $A$ is such that:
//! $$A = LL^\top,$$
//! where $L$ is a lower triangular matrix.
//!
//! The strictly lower triangular part of $L$ is stored in place of the strictly lower triangular
//! part of $A$, and the diagonal of $L$ in a separate vector, so that the upper triangular part
//! of $A$ is preserved.

/// Computing the decomposition.
pub mod compute;
/// Reconstructing the original matrix from the decomposition.
pub mod reconstruct;
/// Solving a linear system using the decomposition.
pub mod solve;

/// This error signifies that the Cholesky decomposition could not be computed due to the matrix
/// not being numerically positive definite.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CholeskyError {
    /// A diagonal element of the factor would have been the square root of a non-positive
    /// number.
    NotPositiveDefinite {
        /// The dimension of the first square non positive-definite top-left corner of the input
        /// matrix.
        minor: usize,
    },
}

impl core::fmt::Display for CholeskyError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for CholeskyError {}
