use thiserror::Error;

use crate::core::pose::model::InferenceError;

use super::config::ConfigError;

/// Invocation-level failures. Per-frame decode/inference problems never
/// surface here; they drop the one frame and the pipeline degrades to a
/// partial sequence instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The video could not be opened, probed, or yielded no frames.
    #[error("frame extraction failed: {0}")]
    Extraction(String),
    /// The pose model is unusable; retrying per frame cannot help.
    #[error("pose model unavailable: {0}")]
    ModelUnavailable(String),
    /// Every sampled frame was dropped. Distinct from partial success.
    #[error("no frames survived decoding and pose estimation")]
    EmptySequence,
    #[error("analysis cancelled")]
    Cancelled,
    #[error("worker pool unavailable: {0}")]
    Worker(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single frame's raster could not be turned into a valid tensor.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read frame file: {0}")]
    Read(#[source] std::io::Error),
    #[error("invalid raster data: {0}")]
    InvalidImage(#[from] image::ImageError),
    #[error("frame has missing or zero dimensions")]
    ZeroDimensions,
    #[error("decoded raster {actual_width}x{actual_height} does not match declared {declared_width}x{declared_height}")]
    DimensionMismatch {
        declared_width: u32,
        declared_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Why one frame was dropped. Logged at the frame level, never propagated
/// as an invocation failure (except fatal inference errors, which the
/// orchestrator promotes to [`PipelineError::ModelUnavailable`]).
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("pose inference failed: {0}")]
    Inference(#[from] InferenceError),
}
