//! Visual complexity measures for colour and multispectral images
//!
//! Images are decoded, masked by their alpha channel, optionally reduced to
//! greyscale, resized and blurred, then scored by a set of independent
//! estimators: discrete and differential entropy, covariance dispersion,
//! Fourier and wavelet energy, and pairwise patch distances including
//! Gaussian divergences and optimal transport.

#![forbid(unsafe_code)]

/// Measure registry and per-image orchestration
pub mod algorithm;
/// Complexity estimators over pixels, patches and spectra
pub mod analysis;
/// Input/output operations, configuration and error handling
pub mod io;
/// Special functions, dense linear algebra and nearest-neighbour search
pub mod math;
/// Preprocessing filters and the fixed-order pipeline
pub mod preprocess;
/// Image buffer and patch decomposition
pub mod spatial;

pub use io::error::{ComplexityError, Result};
