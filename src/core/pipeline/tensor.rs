use image::RgbImage;

/// Channels per pixel in a decoded frame tensor (RGB).
pub const CHANNELS: usize = 3;

/// Normalized pixel data for one decoded frame: `height x width x 3` floats
/// in `[0, 1]`, HWC layout, RGB channel order.
///
/// Owned exclusively by the pipeline step holding it; moved into the pose
/// estimator by value so the buffer is released at estimator scope exit on
/// both success and failure paths.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTensor {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FrameTensor {
    /// Converts raw 0-255 channel bytes into normalized floats.
    pub fn from_rgb(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let data = img.into_raw().iter().map(|&b| f32::from(b) / 255.0).collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Re-materializes the tensor as an 8-bit RGB image, for backends that
    /// need to resize to their model's input resolution.
    pub fn to_rgb8(&self) -> RgbImage {
        let bytes: Vec<u8> = self
            .data
            .iter()
            .map(|&v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        RgbImage::from_raw(self.width, self.height, bytes).expect("tensor buffer matches dimensions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_shape_and_normalization() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(0, 0, Rgb([0, 128, 255]));
        let tensor = FrameTensor::from_rgb(img);

        assert_eq!(tensor.shape(), (2, 4, 3));
        assert_eq!(tensor.len(), 2 * 4 * 3);
        assert!(tensor.data().iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(tensor.data()[0], 0.0);
        assert!((tensor.data()[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rgb8_roundtrip() {
        let img = RgbImage::from_pixel(3, 3, Rgb([10, 200, 90]));
        let tensor = FrameTensor::from_rgb(img.clone());
        assert_eq!(tensor.to_rgb8(), img);
    }
}
