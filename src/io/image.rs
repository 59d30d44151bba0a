//! Image decoding and input enumeration
//!
//! Files are decoded with the `image` crate. Pixel values keep their native
//! range: 8-bit sources give 0..=255, 16-bit sources 0..=65535. Floating-point
//! sources are quantised to 16 bits.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use log::debug;
use ndarray::{Array2, Array3};
use num_traits::ToPrimitive;

use crate::io::configuration::IMAGE_EXTENSIONS;
use crate::io::error::{ComplexityError, ErrorContext, Result, WithContext, invalid_image};
use crate::spatial::DecodedImage;

/// Whether a path carries one of the accepted image extensions
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(extension))
        })
}

/// Split interleaved samples into channel data and an optional alpha plane
fn deinterleave<T>(
    raw: &[T],
    (width, height): (u32, u32),
    stride: usize,
    has_alpha: bool,
) -> Result<(Array3<f64>, Option<Array2<f64>>)>
where
    T: ToPrimitive,
{
    let (width, height) = (width as usize, height as usize);
    if raw.len() != width * height * stride {
        return Err(invalid_image(&format!(
            "expected {} samples for a {width}x{height} image, found {}",
            width * height * stride,
            raw.len()
        )));
    }
    let sample = |row: usize, col: usize, channel: usize| {
        raw.get((row * width + col) * stride + channel)
            .and_then(ToPrimitive::to_f64)
            .unwrap_or(0.0)
    };
    let channels = if has_alpha { stride - 1 } else { stride };
    let data = Array3::from_shape_fn((height, width, channels), |(row, col, channel)| {
        sample(row, col, channel)
    });
    let alpha = has_alpha
        .then(|| Array2::from_shape_fn((height, width), |(row, col)| sample(row, col, channels)));
    Ok((data, alpha))
}

/// Convert a decoded image into native-range channel planes
///
/// Standard mode always yields three colour channels; `mspec` keeps the
/// native count (one for greyscale sources).
///
/// # Errors
///
/// Returns an error if the pixel buffer does not match the image size
pub fn decoded_from_dynamic(image: &DynamicImage, mspec: bool) -> Result<DecodedImage> {
    let color = image.color();
    let has_alpha = color.has_alpha();
    let grey = !color.has_color();
    let bits_per_sample =
        u32::from(color.bytes_per_pixel()) * 8 / u32::from(color.channel_count().max(1));
    let dimensions = image.dimensions();

    let (data, alpha, bit_depth) = if bits_per_sample <= 8 {
        let (data, alpha) = match (mspec && grey, has_alpha) {
            (true, true) => deinterleave(image.to_luma_alpha8().as_raw(), dimensions, 2, true)?,
            (true, false) => deinterleave(image.to_luma8().as_raw(), dimensions, 1, false)?,
            (false, true) => deinterleave(image.to_rgba8().as_raw(), dimensions, 4, true)?,
            (false, false) => deinterleave(image.to_rgb8().as_raw(), dimensions, 3, false)?,
        };
        (data, alpha, 8)
    } else {
        let (data, alpha) = match (mspec && grey, has_alpha) {
            (true, true) => deinterleave(image.to_luma_alpha16().as_raw(), dimensions, 2, true)?,
            (true, false) => deinterleave(image.to_luma16().as_raw(), dimensions, 1, false)?,
            (false, true) => deinterleave(image.to_rgba16().as_raw(), dimensions, 4, true)?,
            (false, false) => deinterleave(image.to_rgb16().as_raw(), dimensions, 3, false)?,
        };
        (data, alpha, 16)
    };

    Ok(DecodedImage {
        data,
        alpha,
        bit_depth,
    })
}

/// Decode one image file
///
/// # Errors
///
/// Returns an `ImageLoad` error naming the path if decoding fails
pub fn load_image(path: &Path, mspec: bool) -> Result<DecodedImage> {
    let image = image::open(path).with_path(path)?;
    debug!(
        "decoded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    decoded_from_dynamic(&image, mspec)
}

fn sorted_entries(directory: &Path) -> Result<Vec<PathBuf>> {
    let context = || ErrorContext {
        path: Some(directory.to_path_buf()),
        operation: Some("read directory"),
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(directory).with_context(context())? {
        entries.push(entry.with_context(context())?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Decode a directory of single-plane images into one multispectral image
///
/// Files are taken in file-name order, each contributing one channel. Colour
/// files are reduced to luminance. All files must share size and bit depth.
///
/// # Errors
///
/// Returns an error if the directory holds no images, a file fails to
/// decode, or the planes disagree on size or bit depth
pub fn load_channel_stack(directory: &Path) -> Result<DecodedImage> {
    let files: Vec<PathBuf> = sorted_entries(directory)?
        .into_iter()
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    if files.is_empty() {
        return Err(invalid_image(&format!(
            "channel stack '{}' contains no images",
            directory.display()
        )));
    }

    let mut planes: Vec<Array2<f64>> = Vec::with_capacity(files.len());
    let mut stack_depth = None;
    for file in &files {
        let plane = load_image(file, true)?;
        let (height, width, _) = plane.data.dim();
        let first = plane.data.index_axis(ndarray::Axis(2), 0).to_owned();
        if let Some(previous) = planes.first() {
            if previous.dim() != (height, width) {
                return Err(invalid_image(&format!(
                    "'{}' is {height}x{width} but the stack is {:?}",
                    file.display(),
                    previous.dim()
                )));
            }
        }
        match stack_depth {
            Some(depth) if depth != plane.bit_depth => {
                return Err(invalid_image(&format!(
                    "'{}' has {} bits per sample but the stack has {depth}",
                    file.display(),
                    plane.bit_depth
                )));
            }
            _ => stack_depth = Some(plane.bit_depth),
        }
        planes.push(first);
    }

    let (height, width) = planes.first().map_or((0, 0), |plane| plane.dim());
    let data = Array3::from_shape_fn((height, width, planes.len()), |(row, col, channel)| {
        planes
            .get(channel)
            .and_then(|plane| plane.get((row, col)))
            .copied()
            .unwrap_or(0.0)
    });
    debug!(
        "stacked {} channels from {}",
        planes.len(),
        directory.display()
    );
    Ok(DecodedImage {
        data,
        alpha: None,
        bit_depth: stack_depth.unwrap_or(8),
    })
}

/// Decode a file, or a channel-stack directory in `mspec` mode
///
/// # Errors
///
/// Returns an error if the input cannot be decoded
pub fn load_input(path: &Path, mspec: bool) -> Result<DecodedImage> {
    if mspec && path.is_dir() {
        load_channel_stack(path)
    } else {
        load_image(path, mspec)
    }
}

/// Inputs to measure, in the order rows are reported
///
/// A file is measured on its own. A directory contributes its image files in
/// name order; in `mspec` mode its subdirectories are channel stacks.
///
/// # Errors
///
/// Returns an error if the path does not exist or a directory cannot be read
pub fn enumerate_inputs(path: &Path, mspec: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ComplexityError::FileSystem {
            path: path.to_path_buf(),
            operation: "open input",
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    }
    Ok(sorted_entries(path)?
        .into_iter()
        .filter(|entry| {
            (entry.is_file() && has_image_extension(entry)) || (mspec && entry.is_dir())
        })
        .collect())
}
