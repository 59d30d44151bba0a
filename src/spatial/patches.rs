//! Patch decomposition of images into rectangular tiles
//!
//! Patches are references into an [`ImageBuffer`]; pixel data is only copied
//! when a consumer asks for an unfolded vector or a sample matrix. Validity is
//! tracked in a bitset so that every consumer skips the same patches.

use bitvec::prelude::*;
use ndarray::Array2;

use crate::io::error::{Result, invalid_parameter};
use crate::spatial::ImageBuffer;

/// Treatment of patches that would extend past the image border
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BoundaryPolicy {
    /// Discard partial patches
    #[default]
    Drop,
    /// Keep partial patches, clipped to the image bounds
    Clip,
}

/// Rectangular sub-region of an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Patch {
    /// First row covered by the patch
    pub row: usize,
    /// First column covered by the patch
    pub col: usize,
    /// Number of rows covered
    pub height: usize,
    /// Number of columns covered
    pub width: usize,
}

impl Patch {
    /// Number of pixels covered by the patch
    pub const fn area(&self) -> usize {
        self.height * self.width
    }

    /// Whether every pixel under the patch is valid
    pub fn is_unmasked(&self, image: &ImageBuffer) -> bool {
        let Some(mask) = image.mask() else {
            return true;
        };
        (self.row..self.row + self.height).all(|row| {
            (self.col..self.col + self.width)
                .all(|col| mask.get((row, col)).copied().unwrap_or(false))
        })
    }

    /// Flatten the patch into one vector, channel-major then row-major
    pub fn unfold(&self, image: &ImageBuffer) -> Vec<f64> {
        let mut unfolded = Vec::with_capacity(self.area() * image.channels());
        for channel in 0..image.channels() {
            let plane = image.channel(channel);
            for row in self.row..self.row + self.height {
                for col in self.col..self.col + self.width {
                    unfolded.push(plane.get((row, col)).copied().unwrap_or(0.0));
                }
            }
        }
        unfolded
    }

    /// Pixels of the patch as an (area, channels) sample matrix
    pub fn pixel_samples(&self, image: &ImageBuffer) -> Array2<f64> {
        self.points(image, false, 1.0)
    }

    /// One row per pixel, in row-major order
    ///
    /// Each row holds the pixel's channel values divided by `value_scale`.
    /// With `coordinate_augmented`, the row is prefixed by the pixel's (row,
    /// col) position normalised to [0, 1] over the patch, so that values and
    /// positions live on comparable ranges.
    pub fn points(
        &self,
        image: &ImageBuffer,
        coordinate_augmented: bool,
        value_scale: f64,
    ) -> Array2<f64> {
        let channels = image.channels();
        let data = image.data();
        let scale = if value_scale > 0.0 { value_scale } else { 1.0 };
        let offset = if coordinate_augmented { 2 } else { 0 };
        Array2::from_shape_fn((self.area(), channels + offset), |(index, dim)| {
            let local_row = index / self.width;
            let local_col = index % self.width;
            match (coordinate_augmented, dim) {
                (true, 0) => normalized_coordinate(local_row, self.height),
                (true, 1) => normalized_coordinate(local_col, self.width),
                _ => {
                    data.get((self.row + local_row, self.col + local_col, dim - offset))
                        .copied()
                        .unwrap_or(0.0)
                        / scale
                }
            }
        })
    }
}

fn normalized_coordinate(index: usize, extent: usize) -> f64 {
    if extent > 1 {
        index as f64 / (extent - 1) as f64
    } else {
        0.0
    }
}

/// Ordered collection of patches tiling an image
#[derive(Clone, Debug)]
pub struct PatchGrid {
    patches: Vec<Patch>,
    validity: BitVec,
    patch_size: usize,
    stride: usize,
    coordinate_augmented: bool,
}

impl PatchGrid {
    /// Decompose an image into square patches
    ///
    /// Patches start every `stride` pixels along both axes. Patches touching a
    /// masked pixel are kept in the grid but flagged invalid, so consumers see
    /// a stable patch order while skipping them. `coordinate_augmented`
    /// controls whether [`PatchGrid::point_clouds`] appends pixel positions.
    ///
    /// # Errors
    ///
    /// Returns an error if `patch_size` or `stride` is zero
    pub fn decompose(
        image: &ImageBuffer,
        patch_size: usize,
        stride: usize,
        coordinate_augmented: bool,
        boundary: BoundaryPolicy,
    ) -> Result<Self> {
        if patch_size == 0 {
            return Err(invalid_parameter(
                "patch_size",
                &patch_size,
                &"must be at least 1",
            ));
        }
        if stride == 0 {
            return Err(invalid_parameter("stride", &stride, &"must be at least 1"));
        }

        let (height, width) = image.shape();
        let row_starts = tile_starts(height, patch_size, stride, boundary);
        let col_starts = tile_starts(width, patch_size, stride, boundary);

        let mut patches = Vec::with_capacity(row_starts.len() * col_starts.len());
        for &row in &row_starts {
            for &col in &col_starts {
                patches.push(Patch {
                    row,
                    col,
                    height: patch_size.min(height - row),
                    width: patch_size.min(width - col),
                });
            }
        }

        let mut validity = bitvec![0; patches.len()];
        for (index, patch) in patches.iter().enumerate() {
            validity.set(index, patch.is_unmasked(image));
        }

        Ok(Self {
            patches,
            validity,
            patch_size,
            stride,
            coordinate_augmented,
        })
    }

    /// Non-overlapping decomposition (stride equal to patch size)
    ///
    /// # Errors
    ///
    /// Returns an error if `patch_size` is zero
    pub fn non_overlapping(
        image: &ImageBuffer,
        patch_size: usize,
        boundary: BoundaryPolicy,
    ) -> Result<Self> {
        Self::decompose(image, patch_size, patch_size, false, boundary)
    }

    /// All patches, valid or not, in row-major order
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Whether the patch at `index` contains no masked pixel
    pub fn is_valid(&self, index: usize) -> bool {
        self.validity.get(index).as_deref() == Some(&true)
    }

    /// Iterate over the valid patches only
    pub fn valid_patches(&self) -> impl Iterator<Item = &Patch> + '_ {
        self.validity
            .iter_ones()
            .filter_map(|index| self.patches.get(index))
    }

    /// Number of valid patches
    pub fn valid_count(&self) -> usize {
        self.validity.count_ones()
    }

    /// Configured patch side length
    pub const fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Configured stride
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Whether point clouds carry pixel coordinates
    pub const fn coordinate_augmented(&self) -> bool {
        self.coordinate_augmented
    }

    /// Unfolded vectors of valid full-size patches as rows of a matrix
    ///
    /// Clipped border patches have a different dimension and are left out,
    /// since vector statistics need a common space.
    pub fn unfolded(&self, image: &ImageBuffer) -> Array2<f64> {
        let full_area = self.patch_size * self.patch_size;
        let rows: Vec<Vec<f64>> = self
            .valid_patches()
            .filter(|patch| patch.area() == full_area)
            .map(|patch| patch.unfold(image))
            .collect();
        let dimension = rows.first().map_or(0, Vec::len);
        let count = rows.len();
        Array2::from_shape_vec((count, dimension), rows.concat())
            .unwrap_or_else(|_| Array2::zeros((0, dimension)))
    }

    /// Per-pixel point clouds of the valid patches, in grid order
    ///
    /// Points carry patch-local coordinates when the grid was built
    /// coordinate-augmented; see [`Patch::points`].
    pub fn point_clouds(&self, image: &ImageBuffer, value_scale: f64) -> Vec<Array2<f64>> {
        self.valid_patches()
            .map(|patch| patch.points(image, self.coordinate_augmented, value_scale))
            .collect()
    }
}

fn tile_starts(extent: usize, patch_size: usize, stride: usize, boundary: BoundaryPolicy) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut start = 0;
    while start < extent {
        let fits = start + patch_size <= extent;
        if fits || boundary == BoundaryPolicy::Clip {
            starts.push(start);
        }
        if !fits {
            break;
        }
        start += stride;
    }
    starts
}
