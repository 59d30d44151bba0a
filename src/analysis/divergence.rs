//! Pairwise patch distances and Gaussian-assumption divergences
//!
//! Every pairwise measure averages over the full patch × patch cross product,
//! self-pairs included, and divides by the squared patch count. All distances
//! here are symmetric, so each unordered pair is evaluated once and counted
//! twice.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::analysis::covariance::MomentSummary;
use crate::math::linalg::{
    inv_sqrt_spd, log_det_psd, quadratic_form, regularized, spd_inverse, sqrt_psd,
};

/// Closed-form divergence between two Gaussians
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum GaussianDivergence {
    /// Symmetric Kullback–Leibler divergence, KL(a‖b) + KL(b‖a)
    #[default]
    Jeffreys,
    /// Wasserstein-2 distance between Gaussians
    Wasserstein,
    /// Squared Hellinger distance
    Hellinger,
    /// Bhattacharyya distance
    Bhattacharyya,
    /// Förstner–Moonen metric on the affine (mean, covariance) embedding
    #[value(name = "fm-atf")]
    FmAtf,
}

/// A patch distribution modelled as a Gaussian, with cached factorisations
#[derive(Debug, Clone)]
pub struct GaussianPatch {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    inverse: DMatrix<f64>,
    log_det: f64,
    sqrt: DMatrix<f64>,
    embedding: DMatrix<f64>,
    embedding_inv_sqrt: DMatrix<f64>,
}

impl GaussianPatch {
    /// Build from empirical moments, ridge-regularising singular covariances
    pub fn from_moments(moments: &MomentSummary, ridge: f64) -> Self {
        let mean = moments.mean().clone();
        let covariance = regularized(moments.covariance(), ridge);
        let inverse = spd_inverse(&covariance, ridge);
        let log_det = log_det_psd(&covariance);
        let sqrt = sqrt_psd(&covariance);

        // [[Σ + μμᵀ, μ], [μᵀ, 1]] is SPD whenever Σ is
        let dimension = mean.len();
        let mut embedding = DMatrix::zeros(dimension + 1, dimension + 1);
        embedding
            .view_mut((0, 0), (dimension, dimension))
            .copy_from(&(&covariance + &mean * mean.transpose()));
        embedding
            .view_mut((0, dimension), (dimension, 1))
            .copy_from(&mean);
        embedding
            .view_mut((dimension, 0), (1, dimension))
            .copy_from(&mean.transpose());
        if let Some(corner) = embedding.get_mut((dimension, dimension)) {
            *corner = 1.0;
        }
        let embedding_inv_sqrt = inv_sqrt_spd(&embedding);

        Self {
            mean,
            covariance,
            inverse,
            log_det,
            sqrt,
            embedding,
            embedding_inv_sqrt,
        }
    }

    /// Mean vector
    pub const fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Regularised covariance
    pub const fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    fn dimension(&self) -> usize {
        self.mean.len()
    }
}

fn kullback_leibler(a: &GaussianPatch, b: &GaussianPatch) -> f64 {
    let delta = &b.mean - &a.mean;
    let trace_term = (&b.inverse * &a.covariance).trace();
    0.5 * (trace_term + quadratic_form(&b.inverse, &delta) - a.dimension() as f64 + b.log_det
        - a.log_det)
}

fn bhattacharyya(a: &GaussianPatch, b: &GaussianPatch, ridge: f64) -> f64 {
    let delta = &a.mean - &b.mean;
    let pooled = (&a.covariance + &b.covariance) * 0.5;
    let pooled_inverse = spd_inverse(&pooled, ridge);
    let mean_term = quadratic_form(&pooled_inverse, &delta) / 8.0;
    let covariance_term = 0.5 * (log_det_psd(&pooled) - 0.5 * (a.log_det + b.log_det));
    (mean_term + covariance_term).max(0.0)
}

fn gaussian_wasserstein(a: &GaussianPatch, b: &GaussianPatch) -> f64 {
    let delta = &a.mean - &b.mean;
    let cross = sqrt_psd(&(&a.sqrt * &b.covariance * &a.sqrt));
    let squared = 2.0f64.mul_add(
        -cross.trace(),
        delta.norm_squared() + a.covariance.trace() + b.covariance.trace(),
    );
    squared.max(0.0).sqrt()
}

fn forstner_moonen(a: &GaussianPatch, b: &GaussianPatch) -> f64 {
    let relative = &a.embedding_inv_sqrt * &b.embedding * &a.embedding_inv_sqrt;
    nalgebra::SymmetricEigen::new(relative)
        .eigenvalues
        .iter()
        .map(|&lambda| {
            let log = lambda.max(f64::MIN_POSITIVE).ln();
            log * log
        })
        .sum::<f64>()
        .sqrt()
}

impl GaussianDivergence {
    /// Divergence between two Gaussian patches
    ///
    /// All variants are symmetric in their arguments.
    pub fn between(self, a: &GaussianPatch, b: &GaussianPatch, ridge: f64) -> f64 {
        match self {
            Self::Jeffreys => kullback_leibler(a, b) + kullback_leibler(b, a),
            Self::Wasserstein => gaussian_wasserstein(a, b),
            Self::Hellinger => 1.0 - (-bhattacharyya(a, b, ridge)).exp(),
            Self::Bhattacharyya => bhattacharyya(a, b, ridge),
            Self::FmAtf => forstner_moonen(a, b),
        }
    }

    /// Column name fragment
    pub const fn label(self) -> &'static str {
        match self {
            Self::Jeffreys => "jeffreys",
            Self::Wasserstein => "wasserstein",
            Self::Hellinger => "hellinger",
            Self::Bhattacharyya => "bhattacharyya",
            Self::FmAtf => "fm_atf",
        }
    }
}

/// Mean of a symmetric `distance(i, j)` over all ordered pairs, self-pairs included
///
/// Only pairs with `i <= j` are evaluated; off-diagonal terms are counted for
/// both orders. Rows are distributed over the rayon pool. Returns `NaN` for an
/// empty item set.
pub fn pairwise_mean<T, F>(items: &[T], distance: F) -> f64
where
    T: Sync,
    F: Fn(&T, &T) -> f64 + Sync,
{
    if items.is_empty() {
        return f64::NAN;
    }
    let total: f64 = items
        .par_iter()
        .enumerate()
        .map(|(index, a)| {
            let later = items.get(index + 1..).unwrap_or_default();
            let off_diagonal: f64 = later.iter().map(|b| distance(a, b)).sum();
            2.0f64.mul_add(off_diagonal, distance(a, a))
        })
        .sum();
    let count = items.len() as f64;
    total / (count * count)
}

/// Average Euclidean distance between patch mean vectors
pub fn mean_distance(moments: &[MomentSummary]) -> f64 {
    pairwise_mean(moments, |a, b| (a.mean() - b.mean()).norm())
}

/// Weighted sum of mean distance and covariance distance, averaged over pairs
///
/// The covariance term is `sqrt(Σ |Δ_ij|)`, or `|Δ|` for scalar covariances.
pub fn moment_distance(moments: &[MomentSummary], gamma_mean: f64, gamma_cov: f64) -> f64 {
    pairwise_mean(moments, |a, b| {
        gamma_mean.mul_add(
            (a.mean() - b.mean()).norm(),
            gamma_cov * a.dispersion_distance(b),
        )
    })
}

/// Gaussian models for every patch
pub fn gaussian_patches(moments: &[MomentSummary], ridge: f64) -> Vec<GaussianPatch> {
    moments
        .par_iter()
        .map(|summary| GaussianPatch::from_moments(summary, ridge))
        .collect()
}

/// Average Gaussian-assumption divergence over all patch pairs
pub fn gaussian_divergence(
    moments: &[MomentSummary],
    divergence: GaussianDivergence,
    ridge: f64,
) -> f64 {
    let gaussians = gaussian_patches(moments, ridge);
    pairwise_mean(&gaussians, |a, b| divergence.between(a, b, ridge))
}
