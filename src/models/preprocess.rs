//! Image preprocessing for the classifiers
//!
//! Decoded images are converted to RGB, resized to a fixed square with a
//! bilinear filter, scaled to [0, 1] and normalized with the ImageNet
//! per-channel statistics. The output is a flat NCHW buffer for a batch of one.

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use std::path::Path;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Converts images into model input tensors
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    image_size: u32,
}

impl ImagePreprocessor {
    pub fn new(image_size: u32) -> Self {
        Self { image_size }
    }

    /// Tensor shape produced by [`preprocess`](Self::preprocess): `[1, 3, H, W]`
    pub fn input_shape(&self) -> [i64; 4] {
        let size = self.image_size as i64;
        [1, 3, size, size]
    }

    /// Resize and normalize an image into a CHW-ordered buffer
    pub fn preprocess(&self, image: &DynamicImage) -> Vec<f32> {
        let resized = image.resize_exact(self.image_size, self.image_size, FilterType::Triangle);
        let rgb = resized.to_rgb8();
        let num_pixels = (self.image_size * self.image_size) as usize;

        let mut tensor = vec![0.0f32; 3 * num_pixels];
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                tensor[c * num_pixels + i] =
                    (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        tensor
    }

    /// Decode an image file and preprocess it
    pub fn load_and_preprocess(&self, path: &Path) -> Result<Vec<f32>> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;
        Ok(self.preprocess(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_input_shape() {
        assert_eq!(ImagePreprocessor::new(224).input_shape(), [1, 3, 224, 224]);
    }

    #[test]
    fn test_solid_color_normalization() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([255, 0, 128])));
        let preprocessor = ImagePreprocessor::new(8);
        let tensor = preprocessor.preprocess(&image);

        assert_eq!(tensor.len(), 3 * 8 * 8);

        let plane = 64;
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        let blue = (128.0 / 255.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];

        assert!(tensor[..plane].iter().all(|v| (v - red).abs() < 1e-2));
        assert!(tensor[plane..2 * plane].iter().all(|v| (v - green).abs() < 1e-2));
        assert!(tensor[2 * plane..].iter().all(|v| (v - blue).abs() < 1e-2));
    }

    #[test]
    fn test_grayscale_is_expanded_to_rgb() {
        let image = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(5, 5, image::Luma([0])));
        let tensor = ImagePreprocessor::new(4).preprocess(&image);
        assert_eq!(tensor.len(), 3 * 16);
        assert!((tensor[0] - (-IMAGENET_MEAN[0] / IMAGENET_STD[0])).abs() < 1e-4);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ImagePreprocessor::new(224)
            .load_and_preprocess(Path::new("/nonexistent/indoor.jpg"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/indoor.jpg"));
    }
}
