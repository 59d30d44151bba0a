//! Tests for the image buffer, its validity mask and sample extraction

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3, array};
    use visual_complexity::Result;
    use visual_complexity::spatial::ImageBuffer;

    fn two_channel() -> Result<ImageBuffer> {
        let planes = [array![[1_u8, 2], [3, 4]], array![[10_u8, 20], [30, 40]]];
        ImageBuffer::from_planes(&planes, None, 8)
    }

    // Tests planes are interleaved into (height, width, channel) order
    // Verified by swapping the row and column indices in from_planes
    #[test]
    fn test_from_planes_layout() -> Result<()> {
        let image = two_channel()?;
        assert_eq!(image.shape(), (2, 2));
        assert_eq!(image.channels(), 2);
        assert_eq!(image.data().get((0, 1, 0)).copied(), Some(2.0));
        assert_eq!(image.data().get((1, 0, 1)).copied(), Some(30.0));
        Ok(())
    }

    // Tests planes of different shapes are rejected
    // Verified by removing the shape check
    #[test]
    fn test_from_planes_rejects_mismatched_planes() {
        let planes = [Array2::<u8>::zeros((2, 2)), Array2::<u8>::zeros((3, 2))];
        assert!(ImageBuffer::from_planes(&planes, None, 8).is_err());
    }

    // Tests a mask with a different shape is rejected
    // Verified by skipping mask validation in new
    #[test]
    fn test_new_rejects_mask_shape() {
        let data = Array3::<f64>::zeros((2, 2, 1));
        let mask = Array2::from_elem((2, 3), true);
        assert!(ImageBuffer::new(data, Some(mask), 8).is_err());
    }

    // Tests empty images are rejected
    // Verified by allowing zero dimensions
    #[test]
    fn test_new_rejects_empty_image() {
        assert!(ImageBuffer::new(Array3::<f64>::zeros((0, 4, 3)), None, 8).is_err());
        assert!(ImageBuffer::new(Array3::<f64>::zeros((4, 4, 0)), None, 8).is_err());
    }

    // Tests level count follows the bit depth
    // Verified by hardcoding 256 levels
    #[test]
    fn test_levels_follow_bit_depth() -> Result<()> {
        let eight = ImageBuffer::new(Array3::zeros((1, 1, 1)), None, 8)?;
        let sixteen = ImageBuffer::new(Array3::zeros((1, 1, 1)), None, 16)?;
        assert_eq!(eight.levels(), 256);
        assert!((eight.max_level() - 255.0).abs() < f64::EPSILON);
        assert_eq!(sixteen.levels(), 65_536);
        Ok(())
    }

    // Tests masked pixels are excluded from samples and counts
    // Verified by ignoring the mask in valid_pixels
    #[test]
    fn test_valid_pixels_skip_masked() -> Result<()> {
        let mask = array![[true, false], [true, true]];
        let image = two_channel()?;
        let masked = ImageBuffer::new(image.data().clone(), Some(mask), 8)?;
        assert_eq!(masked.valid_pixel_count(), 3);
        let samples = masked.valid_pixels();
        assert_eq!(samples.dim(), (3, 2));
        assert_eq!(samples.row(1).to_vec(), vec![3.0, 30.0]);
        assert!(!masked.is_valid(0, 1));
        Ok(())
    }

    // Tests masked pixels are replaced by the mean of valid pixels
    // Verified by filling with zero instead of the mean
    #[test]
    fn test_filled_with_valid_mean() -> Result<()> {
        let data = array![[[2.0], [100.0], [4.0]]];
        let mask = array![[true, false, true]];
        let image = ImageBuffer::new(data, Some(mask), 8)?;
        let filled = image.filled_with_valid_mean();
        assert_eq!(filled.get((0, 1, 0)).copied(), Some(3.0));
        assert_eq!(filled.get((0, 0, 0)).copied(), Some(2.0));
        Ok(())
    }
}
