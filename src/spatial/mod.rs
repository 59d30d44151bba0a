//! Image data model and patch decomposition
//!
//! This module contains spatial-related functionality including:
//! - The normalised multi-channel image buffer with its validity mask
//! - Patch grids tiling an image, with per-patch validity

/// Image buffer and decoded pixel container
pub mod buffer;
/// Patch extraction, unfolding and validity tracking
pub mod patches;

pub use buffer::{DecodedImage, ImageBuffer};
pub use patches::{BoundaryPolicy, Patch, PatchGrid};
