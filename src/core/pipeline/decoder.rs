use std::fs;

use log::warn;

use super::error::DecodeError;
use super::sampler::ExtractedFrame;
use super::tensor::FrameTensor;

/// Turns an extracted frame into a normalized tensor.
///
/// The frame's on-disk artifact is removed immediately after a successful
/// read, before decoding, so it never outlives this step even when decoding
/// itself fails. That is a resource contract, not an optimization: frame
/// files accumulate fast at video scale.
pub fn decode(frame: ExtractedFrame) -> Result<FrameTensor, DecodeError> {
    let bytes = fs::read(&frame.path).map_err(DecodeError::Read)?;
    if let Err(e) = fs::remove_file(&frame.path) {
        warn!("could not remove frame artifact {:?}: {e}", frame.path);
    }

    if frame.width == 0 || frame.height == 0 {
        return Err(DecodeError::ZeroDimensions);
    }

    let img = image::load_from_memory(&bytes)?.to_rgb8();
    let (actual_width, actual_height) = img.dimensions();
    if actual_width != frame.width || actual_height != frame.height {
        return Err(DecodeError::DimensionMismatch {
            declared_width: frame.width,
            declared_height: frame.height,
            actual_width,
            actual_height,
        });
    }

    Ok(FrameTensor::from_rgb(img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> std::path::PathBuf {
        let img = RgbImage::from_pixel(w, h, Rgb([40, 80, 160]));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    fn frame(path: std::path::PathBuf, w: u32, h: u32) -> ExtractedFrame {
        ExtractedFrame {
            index: 0,
            timestamp_seconds: 0.0,
            width: w,
            height: h,
            path,
        }
    }

    #[test]
    fn test_decode_produces_normalized_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "frame_00000.jpg", 64, 48);

        let tensor = decode(frame(path.clone(), 64, 48)).unwrap();
        assert_eq!(tensor.shape(), (48, 64, 3));
        assert!(tensor.data().iter().all(|&v| (0.0..=1.0).contains(&v)));
        // artifact gone after the read
        assert!(!path.exists());
    }

    #[test]
    fn test_decode_rejects_dimension_mismatch_but_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "frame_00000.jpg", 64, 48);

        let err = decode(frame(path.clone(), 640, 480)).unwrap_err();
        assert!(matches!(err, DecodeError::DimensionMismatch { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_decode_rejects_corrupt_raster_but_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_00000.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = decode(frame(path.clone(), 64, 48)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidImage(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_decode_rejects_zero_declared_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "frame_00000.jpg", 8, 8);

        let err = decode(frame(path, 0, 8)).unwrap_err();
        assert!(matches!(err, DecodeError::ZeroDimensions));
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_09999.jpg");

        let err = decode(frame(path, 64, 48)).unwrap_err();
        assert!(matches!(err, DecodeError::Read(_)));
    }
}
