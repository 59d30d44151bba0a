//! Measurement constants and runtime configuration defaults

use std::collections::BTreeSet;

use crate::algorithm::registry::MeasureKind;
use crate::analysis::divergence::GaussianDivergence;
use crate::analysis::fourier::FrequencyWeighting;
use crate::io::error::{Result, invalid_parameter};
use crate::preprocess::filters::GreyscaleMode;
use crate::spatial::patches::BoundaryPolicy;

/// Side length of the square patches used by patch-based measures
pub const DEFAULT_PATCH_SIZE: usize = 8;

// Keeps near-constant patches away from log(0)
/// Variance offset added inside the local covariance logarithm
pub const LOCAL_COVARIANCE_EPSILON: f64 = 1.0;

/// Ridge added to singular covariances before inversion
pub const DEFAULT_RIDGE: f64 = 1e-6;

/// Neighbour rank used by the k-NN differential entropy estimator
pub const DEFAULT_KNN_K: usize = 3;

/// Sample cap for the k-NN estimator; larger inputs are subsampled
pub const DEFAULT_MAX_SAMPLES: usize = 20_000;

/// Jitter amplitude relative to the level range, breaks ties between identical samples
pub const KNN_JITTER: f64 = 1e-10;

/// Haar decomposition depth for the wavelet measure
pub const DEFAULT_DWT_LEVELS: usize = 4;

/// Fraction of largest detail coefficients retained by the wavelet measure
pub const DEFAULT_DWT_KEEP_FRACTION: f64 = 0.01;

/// Coefficients within this many positions of a masked coefficient are zeroed too
pub const DWT_MASK_EROSION: usize = 2;

/// Order of the Wasserstein distance between patches
pub const DEFAULT_WASSERSTEIN_ORDER: f64 = 2.0;

/// Entropic regularisation strength of the Sinkhorn solver
pub const DEFAULT_SINKHORN_REGULARIZATION: f64 = 0.05;

/// Iteration cap for the Sinkhorn solver
pub const SINKHORN_MAX_ITERATIONS: usize = 10_000;

/// Marginal violation at which Sinkhorn iterations stop
pub const SINKHORN_TOLERANCE: f64 = 1e-9;

/// Unordered patch pairs above which the exact transport solver is reported as slow
pub const EXACT_TRANSPORT_PAIR_WARNING: usize = 100_000;

/// Fixed seed for reproducible subsampling
pub const DEFAULT_SEED: u64 = 42;

/// Suffix appended to measure columns computed on the gradient image
pub const GRADIENT_SUFFIX: &str = "_grad";

/// Header of the image identifier column
pub const IMAGE_COLUMN: &str = "image";

/// File extensions accepted when scanning a directory
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// How the gradient image participates in measurement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientMode {
    /// Measure the preprocessed image only
    #[default]
    Off,
    /// Replace the image with its gradient magnitude everywhere
    Only,
    /// Measure both the image and its gradient magnitude
    Too,
}

impl GradientMode {
    /// Resolve the two command-line flags into a single mode
    ///
    /// # Errors
    ///
    /// Returns an error if both flags are set
    pub fn from_flags(use_grad_only: bool, use_grad_too: bool) -> Result<Self> {
        match (use_grad_only, use_grad_too) {
            (true, true) => Err(invalid_parameter(
                "use_grad_only",
                &true,
                &"cannot be combined with use_grad_too",
            )),
            (true, false) => Ok(Self::Only),
            (false, true) => Ok(Self::Too),
            (false, false) => Ok(Self::Off),
        }
    }

    /// Whether a gradient image has to be derived at all
    pub const fn needs_gradient(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Immutable settings threaded through every component
#[derive(Clone, Debug)]
pub struct ComplexityConfig {
    /// Accept arbitrary channel counts and disable RGB-specific defaults
    pub mspec: bool,
    /// Optional channel reduction applied first
    pub greyscale: Option<GreyscaleMode>,
    /// Optional scale factor applied before blurring
    pub resize: Option<f64>,
    /// Optional Gaussian blur standard deviation, in pixels after resizing
    pub blur: Option<f64>,
    /// Treat every pixel as valid even if an alpha channel exists
    pub ignore_alpha: bool,
    /// Original and/or gradient image selection
    pub gradient: GradientMode,
    /// Measures to compute
    pub measures: BTreeSet<MeasureKind>,
    /// Patch side length
    pub patch_size: usize,
    /// Treatment of patches crossing the image border
    pub boundary: BoundaryPolicy,
    /// Weight of the mean term in the moment distance
    pub gamma_mean: f64,
    /// Weight of the covariance term in the moment distance
    pub gamma_cov: f64,
    /// Divergence used by the Gaussian-assumption measure
    pub divergence: GaussianDivergence,
    /// Ridge added to singular covariances
    pub ridge: f64,
    /// Use the entropic solver instead of exact network flow
    pub sinkhorn: bool,
    /// Entropic regularisation strength
    pub sinkhorn_regularization: f64,
    /// Wasserstein order ρ
    pub wasserstein_order: f64,
    /// Scale factor applied before the transport measure only (ignored when `resize` is set)
    pub transport_downscale: Option<f64>,
    /// Haar decomposition depth
    pub dwt_levels: usize,
    /// Fraction of detail coefficients retained
    pub dwt_keep_fraction: f64,
    /// Frequency weighting of the Fourier measure
    pub frequency_weighting: FrequencyWeighting,
    /// Neighbour rank for differential entropy
    pub knn_k: usize,
    /// Sample cap for differential entropy
    pub max_samples: usize,
    /// Seed for subsampling and jitter
    pub seed: u64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            mspec: false,
            greyscale: None,
            resize: None,
            blur: None,
            ignore_alpha: false,
            gradient: GradientMode::Off,
            measures: MeasureKind::ALL.into_iter().collect(),
            patch_size: DEFAULT_PATCH_SIZE,
            boundary: BoundaryPolicy::Drop,
            gamma_mean: 1.0,
            gamma_cov: 1.0,
            divergence: GaussianDivergence::Jeffreys,
            ridge: DEFAULT_RIDGE,
            sinkhorn: false,
            sinkhorn_regularization: DEFAULT_SINKHORN_REGULARIZATION,
            wasserstein_order: DEFAULT_WASSERSTEIN_ORDER,
            transport_downscale: None,
            dwt_levels: DEFAULT_DWT_LEVELS,
            dwt_keep_fraction: DEFAULT_DWT_KEEP_FRACTION,
            frequency_weighting: FrequencyWeighting::Manhattan,
            knn_k: DEFAULT_KNN_K,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_SEED,
        }
    }
}

impl ComplexityConfig {
    /// Check every option for range and consistency errors
    ///
    /// # Errors
    ///
    /// Returns an `InvalidParameter` error naming the first offending option
    pub fn validate(&self) -> Result<()> {
        if let Some(sigma) = self.blur {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(invalid_parameter("blur", &sigma, &"must be non-negative"));
            }
        }
        if let Some(scale) = self.resize {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(invalid_parameter("resize", &scale, &"must be positive"));
            }
        }
        if let Some(scale) = self.transport_downscale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(invalid_parameter(
                    "transport_downscale",
                    &scale,
                    &"must be positive",
                ));
            }
        }
        if self.patch_size == 0 {
            return Err(invalid_parameter(
                "patch_size",
                &self.patch_size,
                &"must be at least 1",
            ));
        }
        if self.gamma_mean < 0.0 || self.gamma_cov < 0.0 {
            return Err(invalid_parameter(
                "gamma",
                &format!("{}/{}", self.gamma_mean, self.gamma_cov),
                &"weights must be non-negative",
            ));
        }
        if !self.ridge.is_finite() || self.ridge <= 0.0 {
            return Err(invalid_parameter("ridge", &self.ridge, &"must be positive"));
        }
        if !self.sinkhorn_regularization.is_finite() || self.sinkhorn_regularization <= 0.0 {
            return Err(invalid_parameter(
                "sinkhorn_regularization",
                &self.sinkhorn_regularization,
                &"must be positive",
            ));
        }
        if !self.wasserstein_order.is_finite() || self.wasserstein_order < 1.0 {
            return Err(invalid_parameter(
                "wasserstein_order",
                &self.wasserstein_order,
                &"must be at least 1",
            ));
        }
        if self.dwt_levels == 0 {
            return Err(invalid_parameter(
                "dwt_levels",
                &self.dwt_levels,
                &"must be at least 1",
            ));
        }
        if !(self.dwt_keep_fraction > 0.0 && self.dwt_keep_fraction <= 1.0) {
            return Err(invalid_parameter(
                "dwt_keep_fraction",
                &self.dwt_keep_fraction,
                &"must lie in (0, 1]",
            ));
        }
        if self.knn_k == 0 {
            return Err(invalid_parameter("knn_k", &self.knn_k, &"must be at least 1"));
        }
        if self.max_samples <= self.knn_k {
            return Err(invalid_parameter(
                "max_samples",
                &self.max_samples,
                &"must exceed knn_k",
            ));
        }
        if self.mspec && self.greyscale == Some(GreyscaleMode::Human) {
            return Err(invalid_parameter(
                "greyscale",
                &"human",
                &"perceptual weights require RGB input; use avg with mspec",
            ));
        }
        Ok(())
    }

    /// Scale factor to apply before the transport measure, if any
    ///
    /// A global resize already shrinks the image, so the transport-specific
    /// factor only applies when no resize was requested.
    pub const fn effective_transport_downscale(&self) -> Option<f64> {
        match self.resize {
            Some(_) => None,
            None => self.transport_downscale,
        }
    }
}
