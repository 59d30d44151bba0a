//! Named measure functions behind a common interface
//!
//! Every measure is a pure function of one preprocessed image, its
//! non-overlapping patch grid and the run configuration. Selecting measures is
//! a set lookup over [`MeasureKind`]; adding a measure means adding a variant
//! and a function here.

use std::sync::OnceLock;

use crate::analysis::covariance::{
    MomentSummary, global_covariance_complexity, local_covariance_complexity, patch_moments,
};
use crate::analysis::divergence::{gaussian_divergence, mean_distance, moment_distance};
use crate::analysis::entropy::{
    KnnSettings, differential_patch_entropy, differential_pixel_entropy, discrete_patch_entropy,
    discrete_pixel_entropy,
};
use crate::analysis::fourier::fourier_weighted_energy;
use crate::analysis::transport::{TransportSolver, mean_patch_wasserstein};
use crate::analysis::wavelet::wavelet_energy;
use crate::io::configuration::{ComplexityConfig, LOCAL_COVARIANCE_EPSILON};
use crate::io::error::Result;
use crate::spatial::{ImageBuffer, PatchGrid};

/// Identifier of a complexity measure
///
/// Declaration order is the column order of the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum MeasureKind {
    /// Shannon entropy of quantised pixel values
    DiscretePixelEntropy,
    /// Shannon entropy of pixel values within each patch, averaged over patches
    DiscretePatchEntropy,
    /// k-NN differential entropy of pixel vectors
    DifferentialPixelEntropy,
    /// k-NN differential entropy of unfolded patch vectors
    DifferentialPatchEntropy,
    /// Mean log-dispersion of per-patch pixel covariances
    LocalCovariance,
    /// Log-dispersion of the covariance of unfolded patch vectors
    GlobalCovariance,
    /// Frequency-weighted Fourier log-magnitude
    FourierEnergy,
    /// Energy of the largest Haar detail coefficients
    WaveletEnergy,
    /// Mean distance between patch means
    MeanDistance,
    /// Weighted mean and covariance distance between patches
    MomentDistance,
    /// Mean Gaussian-assumption divergence between patches
    GaussianDivergence,
    /// Mean optimal-transport distance between patches
    WassersteinDistance,
}

impl MeasureKind {
    /// Every measure, in report order
    pub const ALL: [Self; 12] = [
        Self::DiscretePixelEntropy,
        Self::DiscretePatchEntropy,
        Self::DifferentialPixelEntropy,
        Self::DifferentialPatchEntropy,
        Self::LocalCovariance,
        Self::GlobalCovariance,
        Self::FourierEnergy,
        Self::WaveletEnergy,
        Self::MeanDistance,
        Self::MomentDistance,
        Self::GaussianDivergence,
        Self::WassersteinDistance,
    ];

    /// Column name of the measure
    pub const fn name(self) -> &'static str {
        match self {
            Self::DiscretePixelEntropy => "discrete_pixel_entropy",
            Self::DiscretePatchEntropy => "discrete_patch_entropy",
            Self::DifferentialPixelEntropy => "differential_pixel_entropy",
            Self::DifferentialPatchEntropy => "differential_patch_entropy",
            Self::LocalCovariance => "local_covariance",
            Self::GlobalCovariance => "global_covariance",
            Self::FourierEnergy => "fourier_energy",
            Self::WaveletEnergy => "wavelet_energy",
            Self::MeanDistance => "mean_distance",
            Self::MomentDistance => "moment_distance",
            Self::GaussianDivergence => "gaussian_divergence",
            Self::WassersteinDistance => "wasserstein_distance",
        }
    }

    /// Function computing the measure
    pub fn function(self) -> MeasureFn {
        match self {
            Self::DiscretePixelEntropy => measure_discrete_pixel_entropy,
            Self::DiscretePatchEntropy => measure_discrete_patch_entropy,
            Self::DifferentialPixelEntropy => measure_differential_pixel_entropy,
            Self::DifferentialPatchEntropy => measure_differential_patch_entropy,
            Self::LocalCovariance => measure_local_covariance,
            Self::GlobalCovariance => measure_global_covariance,
            Self::FourierEnergy => measure_fourier_energy,
            Self::WaveletEnergy => measure_wavelet_energy,
            Self::MeanDistance => measure_mean_distance,
            Self::MomentDistance => measure_moment_distance,
            Self::GaussianDivergence => measure_gaussian_divergence,
            Self::WassersteinDistance => measure_wasserstein_distance,
        }
    }

    /// Compute the measure on one prepared input
    ///
    /// # Errors
    ///
    /// Returns an error if the measure rejects a configuration value
    pub fn compute(self, input: &MeasureInput<'_>, config: &ComplexityConfig) -> Result<f64> {
        (self.function())(input, config)
    }
}

/// Signature shared by every measure
pub type MeasureFn = fn(&MeasureInput<'_>, &ComplexityConfig) -> Result<f64>;

/// Named scalar produced by one measure
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureResult {
    /// Column name, including any gradient suffix
    pub name: String,
    /// Measured value, `NaN` when undefined
    pub value: f64,
}

/// One image and its patch grid, shared read-only by concurrently running measures
///
/// Per-patch moments are computed on first use and reused by every moment-based
/// measure.
#[derive(Debug)]
pub struct MeasureInput<'a> {
    image: &'a ImageBuffer,
    grid: PatchGrid,
    moments: OnceLock<Vec<MomentSummary>>,
}

impl<'a> MeasureInput<'a> {
    /// Decompose the image into non-overlapping patches for measurement
    ///
    /// # Errors
    ///
    /// Returns an error if the configured patch size is zero
    pub fn new(image: &'a ImageBuffer, config: &ComplexityConfig) -> Result<Self> {
        let grid = PatchGrid::non_overlapping(image, config.patch_size, config.boundary)?;
        Ok(Self {
            image,
            grid,
            moments: OnceLock::new(),
        })
    }

    /// Image being measured
    pub const fn image(&self) -> &'a ImageBuffer {
        self.image
    }

    /// Non-overlapping patch grid of the image
    pub const fn grid(&self) -> &PatchGrid {
        &self.grid
    }

    /// Pixel moments of every valid patch
    pub fn moments(&self) -> &[MomentSummary] {
        self.moments
            .get_or_init(|| patch_moments(self.image, &self.grid))
    }
}

const fn knn_settings(config: &ComplexityConfig) -> KnnSettings {
    KnnSettings {
        k: config.knn_k,
        max_samples: config.max_samples,
        seed: config.seed,
    }
}

fn measure_discrete_pixel_entropy(input: &MeasureInput<'_>, _: &ComplexityConfig) -> Result<f64> {
    Ok(discrete_pixel_entropy(input.image()))
}

fn measure_discrete_patch_entropy(input: &MeasureInput<'_>, _: &ComplexityConfig) -> Result<f64> {
    Ok(discrete_patch_entropy(input.image(), input.grid()))
}

fn measure_differential_pixel_entropy(
    input: &MeasureInput<'_>,
    config: &ComplexityConfig,
) -> Result<f64> {
    Ok(differential_pixel_entropy(input.image(), &knn_settings(config)))
}

fn measure_differential_patch_entropy(
    input: &MeasureInput<'_>,
    config: &ComplexityConfig,
) -> Result<f64> {
    Ok(differential_patch_entropy(
        input.image(),
        input.grid(),
        &knn_settings(config),
    ))
}

fn measure_local_covariance(input: &MeasureInput<'_>, _: &ComplexityConfig) -> Result<f64> {
    Ok(local_covariance_complexity(
        input.image(),
        input.grid(),
        LOCAL_COVARIANCE_EPSILON,
    ))
}

fn measure_global_covariance(input: &MeasureInput<'_>, _: &ComplexityConfig) -> Result<f64> {
    Ok(global_covariance_complexity(input.image(), input.grid()))
}

fn measure_fourier_energy(input: &MeasureInput<'_>, config: &ComplexityConfig) -> Result<f64> {
    Ok(fourier_weighted_energy(
        input.image(),
        config.frequency_weighting,
    ))
}

fn measure_wavelet_energy(input: &MeasureInput<'_>, config: &ComplexityConfig) -> Result<f64> {
    Ok(wavelet_energy(
        input.image(),
        config.dwt_levels,
        config.dwt_keep_fraction,
    ))
}

fn measure_mean_distance(input: &MeasureInput<'_>, _: &ComplexityConfig) -> Result<f64> {
    Ok(mean_distance(input.moments()))
}

fn measure_moment_distance(input: &MeasureInput<'_>, config: &ComplexityConfig) -> Result<f64> {
    Ok(moment_distance(
        input.moments(),
        config.gamma_mean,
        config.gamma_cov,
    ))
}

fn measure_gaussian_divergence(
    input: &MeasureInput<'_>,
    config: &ComplexityConfig,
) -> Result<f64> {
    Ok(gaussian_divergence(
        input.moments(),
        config.divergence,
        config.ridge,
    ))
}

fn measure_wasserstein_distance(
    input: &MeasureInput<'_>,
    config: &ComplexityConfig,
) -> Result<f64> {
    let solver = if config.sinkhorn {
        TransportSolver::Sinkhorn {
            regularization: config.sinkhorn_regularization,
        }
    } else {
        TransportSolver::Exact
    };
    mean_patch_wasserstein(
        input.image(),
        config.patch_size,
        config.boundary,
        config.wasserstein_order,
        solver,
        config.effective_transport_downscale(),
    )
}
