//! Discrete and differential entropy estimators
//!
//! Discrete estimators quantise pixel values to the native bit depth and use
//! plug-in Shannon entropy in nats. Differential estimators apply the
//! Kozachenko–Leonenko k-nearest-neighbour estimator to pixel vectors or to
//! unfolded patch vectors.

use log::debug;
use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::io::configuration::KNN_JITTER;
use crate::math::kdtree::KdTree;
use crate::math::special::{digamma, unit_ball_log_volume};
use crate::spatial::{ImageBuffer, PatchGrid};

/// Settings of the k-nearest-neighbour estimator
#[derive(Debug, Clone, Copy)]
pub struct KnnSettings {
    /// Rank of the neighbour whose distance enters the estimate
    pub k: usize,
    /// Largest sample count used; bigger sets are subsampled uniformly
    pub max_samples: usize,
    /// Seed for subsampling and jitter
    pub seed: u64,
}

/// Shannon entropy (nats) of a sequence of discrete levels
///
/// Returns `NaN` for an empty sequence.
pub fn level_entropy(mut levels: Vec<usize>) -> f64 {
    if levels.is_empty() {
        return f64::NAN;
    }
    levels.sort_unstable();
    let total = levels.len() as f64;
    levels
        .chunk_by(|a, b| a == b)
        .map(|run| {
            let p = run.len() as f64 / total;
            -p * p.ln()
        })
        .sum::<f64>()
        .max(0.0)
}

fn quantize(value: f64, max_level: f64) -> usize {
    value.round().clamp(0.0, max_level) as usize
}

/// Mean over channels of the entropy of all valid pixel values
///
/// Each channel is bounded by `ln(levels)`; a constant channel scores 0.
pub fn discrete_pixel_entropy(image: &ImageBuffer) -> f64 {
    if image.valid_pixel_count() == 0 {
        return f64::NAN;
    }
    let max_level = image.max_level();
    let channels = image.channels();
    (0..channels)
        .map(|channel| {
            let levels = image
                .channel(channel)
                .indexed_iter()
                .filter(|&((row, col), _)| image.is_valid(row, col))
                .map(|(_, &value)| quantize(value, max_level))
                .collect();
            level_entropy(levels)
        })
        .sum::<f64>()
        / channels as f64
}

/// Entropy of pixel values within each valid patch, averaged over patches and channels
pub fn discrete_patch_entropy(image: &ImageBuffer, grid: &PatchGrid) -> f64 {
    let patches: Vec<_> = grid.valid_patches().copied().collect();
    if patches.is_empty() {
        return f64::NAN;
    }
    let max_level = image.max_level();
    let channels = image.channels();
    let per_patch: Vec<f64> = patches
        .par_iter()
        .map(|patch| {
            let samples = patch.pixel_samples(image);
            (0..channels)
                .map(|channel| {
                    let levels = samples
                        .column(channel)
                        .iter()
                        .map(|&value| quantize(value, max_level))
                        .collect();
                    level_entropy(levels)
                })
                .sum::<f64>()
                / channels as f64
        })
        .collect();
    per_patch.iter().sum::<f64>() / per_patch.len() as f64
}

/// Kozachenko–Leonenko differential entropy (nats) of the rows of a sample matrix
///
/// `H = ψ(n) − ψ(k) + ln V_d + (d/n) Σ ln ε_i`, where `ε_i` is the Euclidean
/// distance from sample `i` to its k-th nearest neighbour and `V_d` the
/// volume of the d-dimensional unit ball. Returns `NaN` with fewer than
/// `k + 1` samples.
pub fn differential_entropy(samples: ArrayView2<'_, f64>, k: usize) -> f64 {
    let (count, dimension) = samples.dim();
    if k == 0 || count < k + 1 || dimension == 0 {
        return f64::NAN;
    }
    let tree = KdTree::new(samples);
    let log_distances: Vec<f64> = (0..count)
        .into_par_iter()
        .map(|index| {
            tree.kth_neighbor_distance(index, k)
                .map_or(f64::NAN, f64::ln)
        })
        .collect();
    let mean_log_distance = log_distances.iter().sum::<f64>() / count as f64;
    (dimension as f64).mul_add(
        mean_log_distance,
        digamma(count as f64) - digamma(k as f64) + unit_ball_log_volume(dimension),
    )
}

/// Subsample to at most `max_samples` rows and add tie-breaking jitter
///
/// Quantised pixel data contains many exact duplicates, which would give
/// zero neighbour distances. Uniform jitter of amplitude `jitter` separates
/// them without measurably changing the estimate.
pub fn prepare_samples(samples: Array2<f64>, max_samples: usize, jitter: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = samples.nrows();
    let mut prepared = if count > max_samples {
        let mut indices = rand::seq::index::sample(&mut rng, count, max_samples).into_vec();
        indices.sort_unstable();
        debug!("subsampling {count} samples down to {max_samples}");
        samples.select(Axis(0), &indices)
    } else {
        samples
    };
    if jitter > 0.0 {
        prepared.mapv_inplace(|value| value + rng.random_range(-jitter..jitter));
    }
    prepared
}

/// Differential entropy of the valid pixels in channel space
pub fn differential_pixel_entropy(image: &ImageBuffer, settings: &KnnSettings) -> f64 {
    let samples = prepare_samples(
        image.valid_pixels(),
        settings.max_samples,
        KNN_JITTER * image.max_level(),
        settings.seed,
    );
    differential_entropy(samples.view(), settings.k)
}

/// Differential entropy of the unfolded vectors of valid patches
pub fn differential_patch_entropy(
    image: &ImageBuffer,
    grid: &PatchGrid,
    settings: &KnnSettings,
) -> f64 {
    let samples = prepare_samples(
        grid.unfolded(image),
        settings.max_samples,
        KNN_JITTER * image.max_level(),
        settings.seed,
    );
    differential_entropy(samples.view(), settings.k)
}
