//! Image preprocessing applied before measurement

/// Greyscale reduction, bilinear resize, Gaussian blur and gradient magnitude
pub mod filters;
/// Ordered pipeline combining the filters with alpha masking
pub mod pipeline;

pub use pipeline::{PreparedImage, Preprocessor};
