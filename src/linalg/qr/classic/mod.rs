//! Householder QR decomposition, one column at a time.
//!
//! At step $k$, the column $k$ of the working matrix is scaled by its largest element (in absolute
//! value), and the reflection
//! $$Q_k = I - \frac{u_k u_k^\top}{c_k}$$
//! that zeroes its entries below the diagonal is applied to the trailing columns. $u_k$ is stored
//! in place of the column, from the diagonal down, $c_k$ in the vector `c`, and the diagonal of
//! $R$ in the vector `d`. The strictly upper triangular part of $R$ is stored in the strictly upper
//! triangular part of the matrix.
//!
//! The decomposition then satisfies $Q_{n-1} \dots Q_0 A = R$.

/// Computing the decomposition.
pub mod compute;
/// Solving a linear system using the decomposition.
pub mod solve;

/// This error signifies that a column of the matrix was numerically zero when its reflection was
/// computed.
///
/// The decomposition still runs to completion when this happens: the reflection of that column is
/// skipped and the corresponding diagonal element of $R$ is zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QrError {
    /// The matrix is rank deficient.
    Singular {
        /// Index of the first column that was found to be zero.
        column: usize,
    },
}

impl core::fmt::Display for QrError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for QrError {}
