//! Complexity estimators over pixels, patches and whole-image spectra

/// Empirical moments and the local/global covariance measures
pub mod covariance;
/// Pairwise patch distances and Gaussian-assumption divergences
pub mod divergence;
/// Discrete and k-NN differential entropy estimators
pub mod entropy;
/// Frequency-weighted Fourier energy
pub mod fourier;
/// Optimal transport between coordinate-augmented patches
pub mod transport;
/// Haar wavelet coefficient energy
pub mod wavelet;
