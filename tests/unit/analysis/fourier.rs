//! Tests for the frequency-weighted Fourier measure

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3, array};
    use visual_complexity::Result;
    use visual_complexity::analysis::fourier::{
        FrequencyWeighting, dft_magnitude, fourier_weighted_energy, signed_frequency,
    };
    use visual_complexity::spatial::ImageBuffer;

    fn checkerboard(size: usize) -> Result<ImageBuffer> {
        let data = Array3::from_shape_fn((size, size, 1), |(row, col, _)| {
            if (row + col) % 2 == 0 { 255.0 } else { 0.0 }
        });
        ImageBuffer::new(data, None, 8)
    }

    fn smooth(size: usize) -> Result<ImageBuffer> {
        let data = Array3::from_shape_fn((size, size, 1), |(_, col, _)| {
            let phase = std::f64::consts::TAU * col as f64 / size as f64;
            100.0f64.mul_add(phase.cos(), 128.0)
        });
        ImageBuffer::new(data, None, 8)
    }

    fn halves(size: usize) -> Result<ImageBuffer> {
        let data = Array3::from_shape_fn((size, size, 1), |(_, col, _)| {
            if col < size / 2 { 255.0 } else { 0.0 }
        });
        ImageBuffer::new(data, None, 8)
    }

    // Tests DFT bins above the midpoint map to negative frequencies
    // Verified by returning the unsigned index
    #[test]
    fn test_signed_frequency() {
        assert!((signed_frequency(0, 4)).abs() < f64::EPSILON);
        assert!((signed_frequency(2, 4) - 0.5).abs() < f64::EPSILON);
        assert!((signed_frequency(3, 4) + 0.25).abs() < f64::EPSILON);
        assert!((signed_frequency(2, 5) - 0.4).abs() < f64::EPSILON);
    }

    // Tests the weighting functions
    // Verified by swapping Manhattan and Chebyshev
    #[test]
    fn test_weightings() {
        assert!((FrequencyWeighting::Manhattan.weight(0.3, -0.4) - 0.7).abs() < 1e-12);
        assert!((FrequencyWeighting::Euclidean.weight(0.3, -0.4) - 0.5).abs() < 1e-12);
        assert!((FrequencyWeighting::Chebyshev.weight(0.3, -0.4) - 0.4).abs() < 1e-12);
    }

    // Tests DFT magnitudes against a hand-computed 2x2 transform
    // Verified by skipping the column pass
    #[test]
    fn test_dft_magnitude_2x2() {
        let plane = array![[1.0, 2.0], [3.0, 4.0]];
        let magnitude = dft_magnitude(plane.view());
        let expected = array![[10.0, 2.0], [4.0, 0.0]];
        for (value, target) in magnitude.iter().zip(expected.iter()) {
            assert!((value - target).abs() < 1e-12);
        }
    }

    // Tests a constant image has no energy away from the zero frequency
    // Verified by giving the zero frequency a non-zero weight
    #[test]
    fn test_constant_image_scores_zero() -> Result<()> {
        let image = ImageBuffer::new(Array3::from_elem((8, 8, 3), 77.0), None, 8)?;
        let energy = fourier_weighted_energy(&image, FrequencyWeighting::Manhattan);
        assert!(energy.abs() < 1e-9);
        Ok(())
    }

    // Tests fine texture scores higher than a slow gradation
    // Verified by inverting the weights
    #[test]
    fn test_fine_texture_scores_higher() -> Result<()> {
        let fine = fourier_weighted_energy(&checkerboard(16)?, FrequencyWeighting::Manhattan);
        let coarse = fourier_weighted_energy(&smooth(16)?, FrequencyWeighting::Manhattan);
        assert!(fine > coarse, "fine {fine} vs coarse {coarse}");
        Ok(())
    }

    // Tests masked pixels are replaced by the valid mean before transforming
    // Verified by transforming the raw masked values
    #[test]
    fn test_masked_pixels_filled() -> Result<()> {
        let base = halves(8)?;
        let mut outlier = base.data().clone();
        if let Some(pixel) = outlier.get_mut((3, 3, 0)) {
            *pixel = 10_000.0;
        }
        let mut mask = Array2::from_elem((8, 8), true);
        if let Some(pixel) = mask.get_mut((3, 3)) {
            *pixel = false;
        }
        let masked = ImageBuffer::new(outlier, Some(mask.clone()), 8)?;

        let mut filled = base.data().clone();
        let mean = masked.valid_channel_mean(0);
        if let Some(pixel) = filled.get_mut((3, 3, 0)) {
            *pixel = mean;
        }
        let reference = ImageBuffer::new(filled, None, 8)?;

        let with_mask = fourier_weighted_energy(&masked, FrequencyWeighting::Euclidean);
        let with_fill = fourier_weighted_energy(&reference, FrequencyWeighting::Euclidean);
        assert!((with_mask - with_fill).abs() < 1e-12);
        Ok(())
    }

    // Tests a single pixel has only the zero frequency and is undefined
    // Verified by returning zero when all weights vanish
    #[test]
    fn test_single_pixel_is_nan() -> Result<()> {
        let image = ImageBuffer::new(Array3::from_elem((1, 1, 1), 5.0), None, 8)?;
        assert!(fourier_weighted_energy(&image, FrequencyWeighting::Manhattan).is_nan());
        Ok(())
    }
}
