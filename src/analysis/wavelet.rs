//! Haar wavelet detail energy
//!
//! Repeated 2D Haar analysis splits each channel into an approximation and
//! horizontal, vertical and diagonal details. Only the largest detail
//! coefficients count towards the score, which makes it insensitive to the
//! weak texture noise that dominates the coefficient count.

use ndarray::{Array2, ArrayView2};

use crate::io::configuration::DWT_MASK_EROSION;
use crate::spatial::ImageBuffer;

/// One level of a 2D Haar decomposition
#[derive(Debug, Clone)]
pub struct HaarLevel {
    /// Low-pass approximation, input to the next level
    pub approx: Array2<f64>,
    /// Detail across rows (horizontal edges)
    pub horizontal: Array2<f64>,
    /// Detail across columns (vertical edges)
    pub vertical: Array2<f64>,
    /// Diagonal detail
    pub diagonal: Array2<f64>,
    /// Coefficients whose whole support is valid, `None` when unmasked
    pub mask: Option<Array2<bool>>,
}

/// Single-level 2D Haar transform with symmetric extension of odd sizes
pub fn haar_dwt2(plane: ArrayView2<'_, f64>, mask: Option<ArrayView2<'_, bool>>) -> HaarLevel {
    let (height, width) = plane.dim();
    let out_shape = (height.div_ceil(2), width.div_ceil(2));
    let at = |row: usize, col: usize| {
        plane
            .get((row.min(height - 1), col.min(width - 1)))
            .copied()
            .unwrap_or(0.0)
    };
    let quad = |row: usize, col: usize| {
        (
            at(2 * row, 2 * col),
            at(2 * row, 2 * col + 1),
            at(2 * row + 1, 2 * col),
            at(2 * row + 1, 2 * col + 1),
        )
    };

    let approx = Array2::from_shape_fn(out_shape, |(r, c)| {
        let (a, b, cc, d) = quad(r, c);
        (a + b + cc + d) / 2.0
    });
    let horizontal = Array2::from_shape_fn(out_shape, |(r, c)| {
        let (a, b, cc, d) = quad(r, c);
        (a + b - cc - d) / 2.0
    });
    let vertical = Array2::from_shape_fn(out_shape, |(r, c)| {
        let (a, b, cc, d) = quad(r, c);
        (a - b + cc - d) / 2.0
    });
    let diagonal = Array2::from_shape_fn(out_shape, |(r, c)| {
        let (a, b, cc, d) = quad(r, c);
        (a - b - cc + d) / 2.0
    });

    let mask = mask.map(|mask| {
        Array2::from_shape_fn(out_shape, |(r, c)| {
            [(0, 0), (0, 1), (1, 0), (1, 1)].iter().all(|&(dr, dc)| {
                mask.get(((2 * r + dr).min(height - 1), (2 * c + dc).min(width - 1)))
                    .copied()
                    .unwrap_or(false)
            })
        })
    });

    HaarLevel {
        approx,
        horizontal,
        vertical,
        diagonal,
        mask,
    }
}

/// Multi-level Haar decomposition, finest level first
pub fn haar_wavedec2(
    plane: ArrayView2<'_, f64>,
    mask: Option<ArrayView2<'_, bool>>,
    levels: usize,
) -> Vec<HaarLevel> {
    let mut decomposition: Vec<HaarLevel> = Vec::with_capacity(levels);
    for _ in 0..levels {
        let level = match decomposition.last() {
            None => haar_dwt2(plane, mask),
            Some(previous) => haar_dwt2(
                previous.approx.view(),
                previous.mask.as_ref().map(|mask| mask.view()),
            ),
        };
        decomposition.push(level);
    }
    decomposition
}

/// Binary erosion with a square window of the given radius
///
/// A position stays valid only if every in-bounds position within `radius`
/// (Chebyshev distance) is valid. Positions outside the array do not erode.
pub fn erode(mask: ArrayView2<'_, bool>, radius: usize) -> Array2<bool> {
    let (height, width) = mask.dim();
    Array2::from_shape_fn((height, width), |(row, col)| {
        (row.saturating_sub(radius)..=(row + radius).min(height - 1)).all(|r| {
            (col.saturating_sub(radius)..=(col + radius).min(width - 1))
                .all(|c| mask.get((r, c)).copied().unwrap_or(false))
        })
    })
}

/// Linearly interpolated percentile (0..=100) of sorted values
pub fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return f64::NAN;
    };
    let position = (percentile / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let low_value = sorted.get(lower).copied().unwrap_or(last);
    let high_value = sorted.get(upper).copied().unwrap_or(last);
    (high_value - low_value).mul_add(position - lower as f64, low_value)
}

/// Sum of magnitudes at or above the `(1 - keep_fraction)` percentile
pub fn top_fraction_sum(mut magnitudes: Vec<f64>, keep_fraction: f64) -> f64 {
    magnitudes.sort_unstable_by(f64::total_cmp);
    let threshold = percentile_sorted(&magnitudes, (1.0 - keep_fraction) * 100.0);
    magnitudes.iter().filter(|&&m| m >= threshold).sum()
}

/// Energy of the strongest Haar detail coefficients, normalised by pixel count
///
/// Values are scaled to [0, 1] by the maximum level first. For every channel
/// and orientation, coefficients across all levels are thresholded at the
/// `(1 - keep_fraction)` percentile of their magnitudes; the kept magnitudes
/// are summed over channels and orientations and divided by M·N.
///
/// With a mask, each level's coefficient mask is eroded by
/// `DWT_MASK_EROSION` and masked coefficients enter the percentile pool as
/// zeros. Returns `NaN` if no coefficient is valid.
pub fn wavelet_energy(image: &ImageBuffer, levels: usize, keep_fraction: f64) -> f64 {
    let scale = image.max_level();
    let (height, width) = image.shape();
    let mut total = 0.0;
    let mut any_valid = false;

    for channel in 0..image.channels() {
        let plane = image.channel(channel).mapv(|value| value / scale);
        let decomposition = haar_wavedec2(plane.view(), image.mask().map(|mask| mask.view()), levels);

        let mut orientations: [Vec<f64>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for level in &decomposition {
            let valid = level
                .mask
                .as_ref()
                .map(|mask| erode(mask.view(), DWT_MASK_EROSION));
            let details = [&level.horizontal, &level.vertical, &level.diagonal];
            for (collected, detail) in orientations.iter_mut().zip(details) {
                for (index, &coefficient) in detail.indexed_iter() {
                    let kept = valid
                        .as_ref()
                        .is_none_or(|mask| mask.get(index).copied().unwrap_or(false));
                    any_valid |= kept;
                    collected.push(if kept { coefficient.abs() } else { 0.0 });
                }
            }
        }

        for magnitudes in orientations {
            if !magnitudes.is_empty() {
                total += top_fraction_sum(magnitudes, keep_fraction);
            }
        }
    }

    if any_valid {
        total / (height * width) as f64
    } else {
        f64::NAN
    }
}
