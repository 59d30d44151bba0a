//! Tests for the Haar transform and wavelet coefficient energy

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3, array};
    use visual_complexity::Result;
    use visual_complexity::analysis::wavelet::{
        erode, haar_dwt2, haar_wavedec2, percentile_sorted, top_fraction_sum, wavelet_energy,
    };
    use visual_complexity::spatial::ImageBuffer;

    // Tests one Haar step on a 2x2 block
    // Verified by dividing by 4 instead of 2
    #[test]
    fn test_haar_single_block() {
        let plane = array![[1.0, 2.0], [3.0, 4.0]];
        let level = haar_dwt2(plane.view(), None);
        assert_eq!(level.approx, array![[5.0]]);
        assert_eq!(level.horizontal, array![[-2.0]]);
        assert_eq!(level.vertical, array![[-1.0]]);
        assert_eq!(level.diagonal, array![[0.0]]);
        assert!(level.mask.is_none());
    }

    // Tests odd sizes round up and the Haar step preserves energy on even sizes
    // Verified by truncating odd sizes
    #[test]
    fn test_haar_shapes_and_energy() {
        let odd = Array2::from_shape_fn((5, 3), |(row, col)| (row + col) as f64);
        assert_eq!(haar_dwt2(odd.view(), None).approx.dim(), (3, 2));

        let even = Array2::from_shape_fn((4, 6), |(row, col)| ((row * 7 + col * 3) % 5) as f64);
        let level = haar_dwt2(even.view(), None);
        let energy = |a: &Array2<f64>| a.iter().map(|v| v * v).sum::<f64>();
        let total = energy(&level.approx)
            + energy(&level.horizontal)
            + energy(&level.vertical)
            + energy(&level.diagonal);
        assert!((total - energy(&even)).abs() < 1e-9);
    }

    // Tests coefficient validity requires the whole support to be valid
    // Verified by checking only the top-left support pixel
    #[test]
    fn test_haar_mask_support() {
        let plane = Array2::<f64>::zeros((4, 4));
        let mut mask = Array2::from_elem((4, 4), true);
        if let Some(pixel) = mask.get_mut((1, 1)) {
            *pixel = false;
        }
        let levels = haar_wavedec2(plane.view(), Some(mask.view()), 2);
        assert_eq!(levels.len(), 2);
        let first = levels.first().and_then(|level| level.mask.clone());
        assert_eq!(first, Some(array![[false, true], [true, true]]));
        let second = levels.last().and_then(|level| level.mask.clone());
        assert_eq!(second, Some(array![[false]]));
    }

    // Tests linear-interpolation percentiles
    // Verified by using nearest-rank percentiles
    #[test]
    fn test_percentile_sorted() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile_sorted(&values, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile_sorted(&values, 100.0) - 4.0).abs() < 1e-12);
        assert!((percentile_sorted(&values, 0.0) - 1.0).abs() < 1e-12);
        assert!(percentile_sorted(&[], 50.0).is_nan());
    }

    // Tests only coefficients at or above the 99th percentile are kept
    // Verified by keeping coefficients below the threshold
    #[test]
    fn test_top_fraction_sum() {
        let magnitudes: Vec<f64> = (1..=100).map(f64::from).collect();
        assert!((top_fraction_sum(magnitudes, 0.01) - 100.0).abs() < 1e-12);
        let all: Vec<f64> = (1..=4).map(f64::from).collect();
        assert!((top_fraction_sum(all, 1.0) - 10.0).abs() < 1e-12);
    }

    // Tests the score of a vertical edge on a 2x2 image
    // Verified by normalising by the coefficient count instead of pixel count
    #[test]
    fn test_wavelet_energy_edge() -> Result<()> {
        let data = Array3::from_shape_fn((2, 2, 1), |(_, col, _)| if col == 1 { 255.0 } else { 0.0 });
        let image = ImageBuffer::new(data, None, 8)?;
        let energy = wavelet_energy(&image, 1, 0.01);
        assert!((energy - 0.25).abs() < 1e-12);
        Ok(())
    }

    // Tests constant images score zero and fully masked images are undefined
    // Verified by reporting zero when no coefficient is valid
    #[test]
    fn test_wavelet_energy_degenerate() -> Result<()> {
        let constant = ImageBuffer::new(Array3::from_elem((8, 8, 3), 40.0), None, 8)?;
        assert!(wavelet_energy(&constant, 4, 0.01).abs() < 1e-12);

        let masked = ImageBuffer::new(
            Array3::from_elem((8, 8, 1), 40.0),
            Some(Array2::from_elem((8, 8), false)),
            8,
        )?;
        assert!(wavelet_energy(&masked, 4, 0.01).is_nan());
        Ok(())
    }

    // Tests erosion clears a square neighbourhood and ignores the array border
    // Verified by treating out-of-bounds positions as masked
    #[test]
    fn test_erode() {
        let mut mask = Array2::from_elem((3, 7), true);
        if let Some(cell) = mask.get_mut((1, 0)) {
            *cell = false;
        }
        let eroded = erode(mask.view(), 2);
        let expected = Array2::from_shape_fn((3, 7), |(_, col)| col > 2);
        assert_eq!(eroded, expected);
        assert_eq!(erode(Array2::from_elem((2, 2), true).view(), 2), Array2::from_elem((2, 2), true));
    }

    // Tests masked coefficients stay in the percentile pool as zeros after erosion
    // Verified by dropping masked coefficients from the pool
    #[test]
    fn test_wavelet_energy_masked_pool() -> Result<()> {
        // Odd columns carry (c + 1) / 8 for coefficient column c, so |vertical| = (c + 1) / 8
        let data = Array3::from_shape_fn((8, 16, 1), |(_, col, _)| {
            if col % 2 == 1 { 255.0 * ((col / 2 + 1) as f64) / 8.0 } else { 0.0 }
        });
        let mask = Array2::from_shape_fn((8, 16), |(_, col)| col >= 2);
        let image = ImageBuffer::new(data, Some(mask), 8)?;
        // Coefficient column 0 is masked, erosion clears columns 1 and 2; 20 of 32 stay
        // valid with magnitudes 0.5..=1. Twelve zeros put the median at 0.5625, so
        // magnitudes 0.625..=1 are kept four times each.
        let energy = wavelet_energy(&image, 1, 0.5);
        assert!((energy - 13.0 / 128.0).abs() < 1e-12, "energy was {energy}");
        Ok(())
    }
}
