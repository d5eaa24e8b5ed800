//! The QR decomposition decomposes a matrix $A$ into the product
//! $$A = QR,$$
//! where $Q$ is an orthogonal matrix, represented as a sequence of Householder reflections, and
//! $R$ is an upper trapezoidal matrix.
//!
//! The reflections are accumulated in panels and applied to the rest of the matrix as block
//! reflectors $I - VTV^\top$, which turns most of the work into matrix multiplications. The
//! explicit $Q$ can be recovered with [`reconstruct::expand_q`].

/// Computing the decomposition.
pub mod compute;
/// Expanding the orthogonal factor of the decomposition.
pub mod reconstruct;
/// Solving a least squares problem using the decomposition.
pub mod solve;
