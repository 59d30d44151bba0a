//! Normalised in-memory image representation with an optional validity mask
//!
//! Pixel values stay in their native range (0..=255 for 8-bit input) so that
//! discrete measures can recover the original quantisation. Transforms never
//! mutate a buffer in place; they build a new one.

use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_traits::ToPrimitive;

use crate::io::error::{Result, invalid_image};

/// Decoded pixels before alpha handling
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Colour or spectral channels, shaped (height, width, channels)
    pub data: Array3<f64>,
    /// Alpha plane in the same value range as `data`, if the source had one
    pub alpha: Option<Array2<f64>>,
    /// Bits per channel of the source encoding
    pub bit_depth: u32,
}

/// Multi-channel image with an optional per-pixel validity mask
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    data: Array3<f64>,
    mask: Option<Array2<bool>>,
    bit_depth: u32,
}

impl ImageBuffer {
    /// Create an image from a (height, width, channels) array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any dimension is zero
    /// - The mask shape differs from the channel planes
    /// - The bit depth is zero or larger than 32
    pub fn new(data: Array3<f64>, mask: Option<Array2<bool>>, bit_depth: u32) -> Result<Self> {
        let (height, width, channels) = data.dim();
        if height == 0 || width == 0 || channels == 0 {
            return Err(invalid_image(&format!(
                "empty image ({height}x{width}, {channels} channels)"
            )));
        }
        if let Some(mask) = &mask {
            if mask.dim() != (height, width) {
                let (mask_height, mask_width) = mask.dim();
                return Err(invalid_image(&format!(
                    "mask is {mask_height}x{mask_width} but channels are {height}x{width}"
                )));
            }
        }
        if bit_depth == 0 || bit_depth > 32 {
            return Err(invalid_image(&format!("unsupported bit depth {bit_depth}")));
        }
        Ok(Self {
            data,
            mask,
            bit_depth,
        })
    }

    /// Create an image from separate channel planes of any numeric type
    ///
    /// # Errors
    ///
    /// Returns an error if the planes disagree on shape, a value cannot be
    /// represented as `f64`, or `new` rejects the assembled array
    pub fn from_planes<T>(
        planes: &[Array2<T>],
        mask: Option<Array2<bool>>,
        bit_depth: u32,
    ) -> Result<Self>
    where
        T: ToPrimitive + Copy,
    {
        let first = planes
            .first()
            .ok_or_else(|| invalid_image(&"no channel planes supplied"))?;
        let (height, width) = first.dim();
        let mut data = Array3::zeros((height, width, planes.len()));
        for (channel, plane) in planes.iter().enumerate() {
            if plane.dim() != (height, width) {
                return Err(invalid_image(&format!(
                    "channel {channel} is {:?} but channel 0 is {:?}",
                    plane.dim(),
                    (height, width)
                )));
            }
            for ((row, col), value) in plane.indexed_iter() {
                let converted = value
                    .to_f64()
                    .ok_or_else(|| invalid_image(&"pixel value not representable as f64"))?;
                if let Some(target) = data.get_mut((row, col, channel)) {
                    *target = converted;
                }
            }
        }
        Self::new(data, mask, bit_depth)
    }

    /// Image with the same mask and bit depth but new pixel data
    ///
    /// # Errors
    ///
    /// Returns an error if the new data does not match the mask shape
    pub fn with_data(&self, data: Array3<f64>) -> Result<Self> {
        Self::new(data, self.mask.clone(), self.bit_depth)
    }

    /// Image height in pixels
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Image width in pixels
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Raw (height, width, channels) pixel array
    pub const fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Validity mask, `None` when every pixel is valid
    pub const fn mask(&self) -> Option<&Array2<bool>> {
        self.mask.as_ref()
    }

    /// Bits per channel of the source encoding
    pub const fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    /// Number of representable levels per channel
    pub fn levels(&self) -> usize {
        1_usize << self.bit_depth.min(usize::BITS - 1)
    }

    /// Largest representable pixel value
    pub fn max_level(&self) -> f64 {
        (self.levels() - 1) as f64
    }

    /// One channel as a 2D view
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(2), channel)
    }

    /// Whether the pixel at (row, col) participates in computation
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask
            .as_ref()
            .is_none_or(|mask| mask.get((row, col)).copied().unwrap_or(false))
    }

    /// Count of valid pixels
    pub fn valid_pixel_count(&self) -> usize {
        self.mask.as_ref().map_or(self.height() * self.width(), |mask| {
            mask.iter().filter(|&&valid| valid).count()
        })
    }

    /// Valid pixels as rows of an (n, channels) sample matrix, in row-major order
    pub fn valid_pixels(&self) -> Array2<f64> {
        let channels = self.channels();
        let mut samples = Vec::with_capacity(self.valid_pixel_count() * channels);
        for row in 0..self.height() {
            for col in 0..self.width() {
                if self.is_valid(row, col) {
                    for channel in 0..channels {
                        samples.push(self.data.get((row, col, channel)).copied().unwrap_or(0.0));
                    }
                }
            }
        }
        let count = samples.len() / channels;
        Array2::from_shape_vec((count, channels), samples).unwrap_or_else(|_| Array2::zeros((0, channels)))
    }

    /// Mean of the valid pixels of one channel, `NaN` if none are valid
    pub fn valid_channel_mean(&self, channel: usize) -> f64 {
        let mut sum = 0.0;
        let mut count = 0_usize;
        for ((row, col), &value) in self.channel(channel).indexed_iter() {
            if self.is_valid(row, col) {
                sum += value;
                count += 1;
            }
        }
        if count == 0 { f64::NAN } else { sum / count as f64 }
    }

    /// Pixel data with masked pixels replaced by their channel's valid mean
    ///
    /// Global transforms such as the Fourier transform cannot skip holes, so
    /// masked regions are filled with a neutral value instead.
    pub fn filled_with_valid_mean(&self) -> Array3<f64> {
        let Some(mask) = &self.mask else {
            return self.data.clone();
        };
        let mut filled = self.data.clone();
        for channel in 0..self.channels() {
            let mean = self.valid_channel_mean(channel);
            let fill = if mean.is_finite() { mean } else { 0.0 };
            let mut plane = filled.index_axis_mut(Axis(2), channel);
            for ((row, col), value) in plane.indexed_iter_mut() {
                if !mask.get((row, col)).copied().unwrap_or(false) {
                    *value = fill;
                }
            }
        }
        filled
    }
}
