//! The partial pivoting LU decomposition is such that:
//! $$PA = LU,$$
//! where $P$ is a permutation matrix, $L$ is a unit lower triangular matrix, and $U$ is
//! an upper triangular matrix.
//!
//! The decomposition is stored in place of $A$: the strictly lower triangular part holds $L$
//! (its unit diagonal is implicit), and the upper triangular part holds $U$. The permutation is
//! stored as a sequence of row transpositions: at elimination step `k`, row `k` was swapped with
//! row `perm[k] >= k`.

/// Computing the decomposition.
pub mod compute;
/// Computing the determinant of the original matrix.
pub mod determinant;
/// Reconstructing the inverse of the original matrix from the decomposition.
pub mod inverse;
/// Reconstructing the original matrix from the decomposition.
pub mod reconstruct;
/// Solving a linear system with iterative refinement of the solution.
pub mod refine;
/// Solving a linear system using the decomposition.
pub mod solve;
