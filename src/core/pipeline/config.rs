use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fps must be positive, got {0}")]
    InvalidFps(f64),
    #[error("frame_count must be positive")]
    InvalidFrameCount,
    #[error("target resolution must be positive, got {0}x{1}")]
    InvalidResolution(u32, u32),
    #[error("max_workers must be positive")]
    InvalidWorkerCount,
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How timestamps are chosen when sampling a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SamplingMode {
    /// One frame every `1/fps` seconds from `t=0`; the video's duration
    /// determines how many.
    FixedFps { fps: f64 },
    /// Exactly `frame_count` frames at evenly spaced timestamps.
    FixedCount { frame_count: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingPolicy {
    #[serde(flatten)]
    pub mode: SamplingMode,
    pub target_width: u32,
    pub target_height: u32,
}

impl SamplingPolicy {
    pub fn fixed_fps(fps: f64, target_width: u32, target_height: u32) -> Self {
        Self {
            mode: SamplingMode::FixedFps { fps },
            target_width,
            target_height,
        }
    }

    pub fn fixed_count(frame_count: u32, target_width: u32, target_height: u32) -> Self {
        Self {
            mode: SamplingMode::FixedCount { frame_count },
            target_width,
            target_height,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            SamplingMode::FixedFps { fps } => {
                if !fps.is_finite() || fps <= 0.0 {
                    return Err(ConfigError::InvalidFps(fps));
                }
            }
            SamplingMode::FixedCount { frame_count } => {
                if frame_count == 0 {
                    return Err(ConfigError::InvalidFrameCount);
                }
            }
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ConfigError::InvalidResolution(
                self.target_width,
                self.target_height,
            ));
        }
        Ok(())
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::fixed_fps(4.0, 640, 480)
    }
}

/// Deployment-supplied pipeline settings; nothing here is hardcoded per
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sampling: SamplingPolicy,
    /// Pose model file for the ONNX backend; unused with an injected model.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Upper bound on concurrent frame decode+inference workers.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingPolicy::default(),
            model_path: None,
            max_workers: default_max_workers(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sampling.validate()?;
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        Ok(())
    }

    /// Pool size actually used: the configured cap, bounded by the machine.
    /// Inference is memory-hungry, so fan-out is never unbounded.
    pub fn worker_count(&self) -> usize {
        self.max_workers.min(num_cpus::get()).max(1)
    }
}
