//! Pixel transforms: channel reduction, resampling, smoothing and gradients
//!
//! Every transform takes an [`ImageBuffer`] by reference and returns a new one.
//! Masked pixels never contribute to a valid output pixel: blurring uses
//! normalised convolution over the valid pixels, and a resampled pixel is
//! valid only when every bilinear tap with non-zero weight is valid.

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::io::error::{Result, invalid_parameter};
use crate::spatial::ImageBuffer;

/// Perceptual luminance weights for (R, G, B), ITU-R BT.709
pub const HUMAN_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// Gaussian kernels extend this many standard deviations on each side
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Weighting used to collapse channels into one
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GreyscaleMode {
    /// Perceptual luminance weights, RGB input only
    Human,
    /// Uniform average over all channels
    Avg,
}

/// Collapse all channels into a single channel
///
/// # Errors
///
/// Returns an error if `Human` weighting is requested for an image that does
/// not have exactly three channels
pub fn greyscale(image: &ImageBuffer, mode: GreyscaleMode) -> Result<ImageBuffer> {
    let channels = image.channels();
    let weights: Vec<f64> = match mode {
        GreyscaleMode::Human => {
            if channels != 3 {
                return Err(invalid_parameter(
                    "greyscale",
                    &"human",
                    &format!("perceptual weights need 3 channels, image has {channels}"),
                ));
            }
            HUMAN_WEIGHTS.to_vec()
        }
        GreyscaleMode::Avg => vec![1.0 / channels as f64; channels],
    };

    let (height, width) = image.shape();
    let data = image.data();
    let reduced = Array3::from_shape_fn((height, width, 1), |(row, col, _)| {
        weights
            .iter()
            .enumerate()
            .map(|(channel, weight)| weight * data.get((row, col, channel)).copied().unwrap_or(0.0))
            .sum()
    });
    image.with_data(reduced)
}

/// Resample by `scale` with bilinear interpolation
///
/// Pixel centres are aligned, so a scale of 1 reproduces the input exactly.
///
/// # Errors
///
/// Returns an error if `scale` is not a positive finite number
pub fn resize_bilinear(image: &ImageBuffer, scale: f64) -> Result<ImageBuffer> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(invalid_parameter("resize", &scale, &"must be positive"));
    }
    let (height, width) = image.shape();
    let new_height = ((height as f64 * scale).round() as usize).max(1);
    let new_width = ((width as f64 * scale).round() as usize).max(1);
    let row_ratio = height as f64 / new_height as f64;
    let col_ratio = width as f64 / new_width as f64;

    let source_position = |dst: usize, ratio: f64, extent: usize| -> (usize, usize, f64) {
        let position = ((dst as f64 + 0.5) * ratio - 0.5).clamp(0.0, (extent - 1) as f64);
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(extent - 1);
        (lower, upper, position - lower as f64)
    };

    let data = image.data();
    let sample = |row: usize, col: usize, channel: usize| data.get((row, col, channel)).copied().unwrap_or(0.0);
    let resized = Array3::from_shape_fn((new_height, new_width, image.channels()), |(row, col, channel)| {
        let (r0, r1, fr) = source_position(row, row_ratio, height);
        let (c0, c1, fc) = source_position(col, col_ratio, width);
        let top = sample(r0, c0, channel).mul_add(1.0 - fc, sample(r0, c1, channel) * fc);
        let bottom = sample(r1, c0, channel).mul_add(1.0 - fc, sample(r1, c1, channel) * fc);
        top.mul_add(1.0 - fr, bottom * fr)
    });

    let mask = image.mask().map(|mask| {
        let valid = |row: usize, col: usize| mask.get((row, col)).copied().unwrap_or(false);
        Array2::from_shape_fn((new_height, new_width), |(row, col)| {
            let (r0, r1, fr) = source_position(row, row_ratio, height);
            let (c0, c1, fc) = source_position(col, col_ratio, width);
            let rows = [(r0, fr < 1.0), (r1, fr > 0.0)];
            let cols = [(c0, fc < 1.0), (c1, fc > 0.0)];
            rows.iter().filter(|(_, used)| *used).all(|&(r, _)| {
                cols.iter()
                    .filter(|(_, used)| *used)
                    .all(|&(c, _)| valid(r, c))
            })
        })
    });

    ImageBuffer::new(resized, mask, image.bit_depth())
}

/// Normalised 1D Gaussian kernel truncated at `GAUSSIAN_TRUNCATE` sigmas
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma).ceil().max(0.0) as i64;
    let taps: Vec<f64> = (-radius..=radius)
        .map(|offset| {
            let x = offset as f64;
            (-0.5 * x * x / (sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = taps.iter().sum();
    taps.into_iter().map(|tap| tap / total).collect()
}

// Half-sample symmetric extension: d c b a | a b c d | d c b a
fn reflect_index(index: i64, extent: usize) -> usize {
    let extent = extent as i64;
    if extent == 1 {
        return 0;
    }
    let period = 2 * extent;
    let wrapped = index.rem_euclid(period);
    let reflected = if wrapped < extent {
        wrapped
    } else {
        period - 1 - wrapped
    };
    reflected as usize
}

fn convolve_axis(plane: ArrayView2<'_, f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let (height, width) = plane.dim();
    let radius = (kernel.len() / 2) as i64;
    Array2::from_shape_fn((height, width), |(row, col)| {
        kernel
            .iter()
            .enumerate()
            .map(|(tap_index, tap)| {
                let offset = tap_index as i64 - radius;
                let (source_row, source_col) = if axis == Axis(0) {
                    (reflect_index(row as i64 + offset, height), col)
                } else {
                    (row, reflect_index(col as i64 + offset, width))
                };
                tap * plane.get((source_row, source_col)).copied().unwrap_or(0.0)
            })
            .sum()
    })
}

fn separable_blur(plane: ArrayView2<'_, f64>, kernel: &[f64]) -> Array2<f64> {
    let vertical = convolve_axis(plane, kernel, Axis(0));
    convolve_axis(vertical.view(), kernel, Axis(1))
}

/// Separable Gaussian blur of every channel
///
/// With a validity mask, each output is `Σ w·m·x / Σ w·m` so masked pixels
/// carry no weight. Masked outputs keep their input value. A sigma of zero
/// returns an unchanged copy.
///
/// # Errors
///
/// Returns an error if `sigma` is negative or not finite
pub fn gaussian_blur(image: &ImageBuffer, sigma: f64) -> Result<ImageBuffer> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(invalid_parameter("blur", &sigma, &"must be non-negative"));
    }
    if sigma == 0.0 {
        return Ok(image.clone());
    }
    let kernel = gaussian_kernel(sigma);
    let weights = image
        .mask()
        .map(|mask| mask.mapv(|valid| if valid { 1.0 } else { 0.0 }));
    let normaliser = weights
        .as_ref()
        .map(|weights| separable_blur(weights.view(), &kernel));

    let mut blurred = Array3::zeros(image.data().dim());
    for channel in 0..image.channels() {
        let plane = image.channel(channel);
        let smoothed = match (&weights, &normaliser) {
            (Some(weights), Some(normaliser)) => {
                let numerator = separable_blur((&plane * weights).view(), &kernel);
                ndarray::Zip::from(&numerator)
                    .and(normaliser)
                    .and(weights)
                    .and(plane)
                    .map_collect(|&sum, &total, &weight, &original| {
                        if weight > 0.0 && total > 0.0 { sum / total } else { original }
                    })
            }
            _ => separable_blur(plane, &kernel),
        };
        blurred.index_axis_mut(Axis(2), channel).assign(&smoothed);
    }
    image.with_data(blurred)
}

// Central differences inside, one-sided differences at the borders
fn axis_derivative(plane: ArrayView2<'_, f64>, axis: Axis) -> Array2<f64> {
    let (height, width) = plane.dim();
    let extent = if axis == Axis(0) { height } else { width };
    Array2::from_shape_fn((height, width), |(row, col)| {
        if extent < 2 {
            return 0.0;
        }
        let position = if axis == Axis(0) { row } else { col };
        let at = |p: usize| {
            let index = if axis == Axis(0) { (p, col) } else { (row, p) };
            plane.get(index).copied().unwrap_or(0.0)
        };
        if position == 0 {
            at(1) - at(0)
        } else if position == extent - 1 {
            at(position) - at(position - 1)
        } else {
            0.5 * (at(position + 1) - at(position - 1))
        }
    })
}

/// Per-channel Euclidean norm of the spatial gradient
///
/// # Errors
///
/// Propagates buffer construction errors; the output always matches the input shape
pub fn gradient_magnitude(image: &ImageBuffer) -> Result<ImageBuffer> {
    let mut magnitude = Array3::zeros(image.data().dim());
    for channel in 0..image.channels() {
        let plane = image.channel(channel);
        let d_row = axis_derivative(plane, Axis(0));
        let d_col = axis_derivative(plane, Axis(1));
        let norm = ndarray::Zip::from(&d_row)
            .and(&d_col)
            .map_collect(|&gy, &gx| gx.hypot(gy));
        magnitude.index_axis_mut(Axis(2), channel).assign(&norm);
    }
    image.with_data(magnitude)
}
