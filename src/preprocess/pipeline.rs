//! Fixed-order preprocessing pipeline
//!
//! Steps run in this order when requested: alpha masking, greyscale
//! reduction, resize, Gaussian blur, gradient derivation. Resizing always
//! precedes blurring so that the blur sigma is expressed in output pixels.

use log::debug;

use crate::io::configuration::{ComplexityConfig, GradientMode};
use crate::io::error::{Result, invalid_image};
use crate::preprocess::filters::{
    GreyscaleMode, gaussian_blur, gradient_magnitude, greyscale, resize_bilinear,
};
use crate::spatial::{DecodedImage, ImageBuffer};

/// Preprocessed image and, when requested, its gradient magnitude
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Image after masking, greyscale, resize and blur
    pub original: ImageBuffer,
    /// Gradient magnitude of `original`
    pub gradient: Option<ImageBuffer>,
}

/// Deterministic transform pipeline configured once per run
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    mspec: bool,
    ignore_alpha: bool,
    greyscale: Option<GreyscaleMode>,
    resize: Option<f64>,
    blur: Option<f64>,
    gradient: GradientMode,
}

impl Preprocessor {
    /// Extract the preprocessing options from a run configuration
    pub const fn from_config(config: &ComplexityConfig) -> Self {
        Self {
            mspec: config.mspec,
            ignore_alpha: config.ignore_alpha,
            greyscale: config.greyscale,
            resize: config.resize,
            blur: config.blur,
            gradient: config.gradient,
        }
    }

    /// Derive the validity mask from the alpha plane
    ///
    /// A pixel is valid when fully opaque. With `ignore_alpha` the alpha plane
    /// is dropped and every pixel is valid.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-multispectral run receives anything other than
    /// three colour channels, or the alpha plane has the wrong shape
    pub fn apply_alpha(&self, decoded: DecodedImage) -> Result<ImageBuffer> {
        let DecodedImage {
            data,
            alpha,
            bit_depth,
        } = decoded;
        let channels = data.dim().2;
        if !self.mspec && channels != 3 {
            return Err(invalid_image(&format!(
                "expected 3 colour channels, found {channels} (enable mspec for arbitrary channel counts)"
            )));
        }
        let mask = match alpha {
            Some(alpha) if !self.ignore_alpha => {
                let opaque = ((1_u64 << bit_depth.min(63)) - 1) as f64;
                Some(alpha.mapv(|value| value >= opaque))
            }
            _ => None,
        };
        ImageBuffer::new(data, mask, bit_depth)
    }

    /// Greyscale, resize and blur, each only when configured
    ///
    /// # Errors
    ///
    /// Returns an error if a transform rejects its parameter
    pub fn transform(&self, image: &ImageBuffer) -> Result<ImageBuffer> {
        let mut current = image.clone();
        if let Some(mode) = self.greyscale {
            current = greyscale(&current, mode)?;
            debug!("greyscale ({mode:?}) -> {} channel", current.channels());
        }
        if let Some(scale) = self.resize {
            current = resize_bilinear(&current, scale)?;
            debug!("resize x{scale} -> {}x{}", current.height(), current.width());
        }
        if let Some(sigma) = self.blur {
            current = gaussian_blur(&current, sigma)?;
            debug!("gaussian blur sigma={sigma}");
        }
        Ok(current)
    }

    /// Run the full pipeline on a decoded image
    ///
    /// # Errors
    ///
    /// Returns an error if masking or any transform fails
    pub fn prepare(&self, decoded: DecodedImage) -> Result<PreparedImage> {
        let masked = self.apply_alpha(decoded)?;
        let original = self.transform(&masked)?;
        let gradient = if self.gradient.needs_gradient() {
            Some(gradient_magnitude(&original)?)
        } else {
            None
        };
        Ok(PreparedImage { original, gradient })
    }
}
