//! Mathematical utilities shared by the estimators

/// k-d tree nearest-neighbour search
pub mod kdtree;
/// Symmetric matrix functions (log-determinant, square roots, regularised inverse)
pub mod linalg;
/// Digamma, log-gamma and unit-ball volumes
pub mod special;
