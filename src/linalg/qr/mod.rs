//! The QR decomposition decomposes a matrix $A$ into the product
//! $$A = QR,$$
//! where $Q$ is an orthogonal matrix, represented as a sequence of Householder reflections, and
//! $R$ is an upper trapezoidal matrix.
//!
//! [`classic`] applies the reflections one column at a time and keeps two scalars per reflection.
//! [`no_pivoting`] groups the reflections into panels that are applied to the trailing matrix with
//! matrix multiplications, and can expand them back into an explicit $Q$.

pub mod classic;
pub mod no_pivoting;
