//! Low level implementation of the Cholesky decomposition.

pub mod llt;
