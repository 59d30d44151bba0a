//! Empirical moments and the covariance-based complexity measures
//!
//! The single-channel special case lives here: whenever the image has one
//! channel, determinant-style quantities use the covariance trace (the plain
//! variance for 1×1 matrices) and matrix norms collapse to absolute
//! differences. Callers get this behaviour through `MomentSummary` and never
//! branch on the channel count themselves.

use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::math::linalg::log_det_psd;
use crate::spatial::{ImageBuffer, PatchGrid};

/// Mean vector and biased covariance matrix of a sample set
#[derive(Debug, Clone, PartialEq)]
pub struct MomentSummary {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    samples: usize,
}

impl MomentSummary {
    /// Estimate moments from the rows of an (n, d) sample matrix
    ///
    /// Uses the N-denominator covariance. Returns `None` for an empty sample set.
    pub fn estimate(samples: ArrayView2<'_, f64>) -> Option<Self> {
        let (count, dimension) = samples.dim();
        if count == 0 {
            return None;
        }
        let n = count as f64;

        let mean = DVector::from_iterator(
            dimension,
            samples.columns().into_iter().map(|column| column.sum() / n),
        );

        let mut covariance = DMatrix::zeros(dimension, dimension);
        for row in samples.rows() {
            let centered = DVector::from_iterator(
                dimension,
                row.iter().zip(mean.iter()).map(|(value, mu)| value - mu),
            );
            covariance.ger(1.0, &centered, &centered, 1.0);
        }
        covariance /= n;

        Some(Self {
            mean,
            covariance,
            samples: count,
        })
    }

    /// Mean vector
    pub const fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Covariance matrix
    pub const fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Dimension of the sample space
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Number of samples the moments were estimated from
    pub const fn sample_count(&self) -> usize {
        self.samples
    }

    /// Whether the covariance is a 1×1 matrix
    pub fn is_scalar(&self) -> bool {
        self.dimension() == 1
    }

    /// Sum of variances
    pub fn trace(&self) -> f64 {
        self.covariance.trace()
    }

    /// Log of the covariance "volume" with an additive offset
    ///
    /// Single-channel data uses `ln(trace + epsilon)`; multi-channel data
    /// uses `ln det(Σ + epsilon·I)`. With `epsilon = 0` a uniform sample set
    /// yields `-inf`, and so does a multi-channel set with no more samples
    /// than dimensions: its covariance has rank below the dimension, and
    /// round-off would otherwise leave a finite noise-level determinant.
    pub fn log_dispersion(&self, channels: usize, epsilon: f64) -> f64 {
        if channels == 1 || self.is_scalar() {
            return (self.trace() + epsilon).ln();
        }
        let dimension = self.dimension();
        if epsilon <= 0.0 && self.samples <= dimension {
            return f64::NEG_INFINITY;
        }
        let shifted = &self.covariance + DMatrix::identity(dimension, dimension) * epsilon;
        log_det_psd(&shifted)
    }

    /// Distance between two covariance matrices
    ///
    /// `sqrt(Σ |a_ij - b_ij|)` in general, the plain absolute difference for
    /// scalar covariances.
    pub fn dispersion_distance(&self, other: &Self) -> f64 {
        let entry_sum: f64 = self
            .covariance
            .iter()
            .zip(other.covariance.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        if self.is_scalar() && other.is_scalar() {
            entry_sum
        } else {
            entry_sum.sqrt()
        }
    }
}

/// Per-pixel moments of every valid patch, in grid order
pub fn patch_moments(image: &ImageBuffer, grid: &PatchGrid) -> Vec<MomentSummary> {
    let patches: Vec<_> = grid.valid_patches().copied().collect();
    patches
        .par_iter()
        .filter_map(|patch| MomentSummary::estimate(patch.pixel_samples(image).view()))
        .collect()
}

/// Average over valid patches of the per-patch log dispersion
///
/// Each patch treats its pixels as samples in channel space and adds
/// `epsilon` so that constant patches contribute `ln(epsilon)` instead of
/// `-inf`. `NaN` when no patch is valid.
pub fn local_covariance_complexity(image: &ImageBuffer, grid: &PatchGrid, epsilon: f64) -> f64 {
    let moments = patch_moments(image, grid);
    if moments.is_empty() {
        return f64::NAN;
    }
    let channels = image.channels();
    moments
        .iter()
        .map(|summary| summary.log_dispersion(channels, epsilon))
        .sum::<f64>()
        / moments.len() as f64
}

/// Log dispersion of the unfolded patch vectors taken as one sample set
///
/// No offset is added: a perfectly uniform image legitimately gives `-inf`.
/// `NaN` when no full-size valid patch exists.
pub fn global_covariance_complexity(image: &ImageBuffer, grid: &PatchGrid) -> f64 {
    let unfolded = grid.unfolded(image);
    MomentSummary::estimate(unfolded.view())
        .map_or(f64::NAN, |summary| summary.log_dispersion(image.channels(), 0.0))
}
