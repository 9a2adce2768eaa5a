use thiserror::Error;

use crate::core::pipeline::tensor::FrameTensor;

use super::keypoint::{BodyPart, Keypoint};
use super::sequence::Pose;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model not initialized")]
    NotReady,
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("input tensor {width}x{height} incompatible with model")]
    IncompatibleShape { width: u32, height: u32 },
    #[error("inference backend error: {0}")]
    Backend(String),
}

impl InferenceError {
    /// Fatal errors abort the whole invocation; the rest drop one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InferenceError::NotReady | InferenceError::ModelLoad(_))
    }
}

/// A loaded single-pose detection model.
///
/// Handles are passed explicitly into the pipeline rather than living in
/// global state, so tests can substitute a deterministic fake. `&self`
/// inference lets one handle be shared across concurrent invocations.
/// Implementations resize internally when the tensor resolution differs from
/// the model's input shape, and must not filter keypoints by confidence.
pub trait PoseModel: Send + Sync {
    /// Runs inference over one frame tensor. The tensor is consumed: its
    /// buffer is freed at scope exit whether inference succeeds or fails.
    fn estimate(&self, tensor: FrameTensor) -> Result<Pose, InferenceError>;
}

enum MockBehavior {
    Healthy,
    NotReady,
    AlwaysFailing,
}

/// Deterministic stand-in for a real pose model.
pub struct MockPoseModel {
    behavior: MockBehavior,
    keypoint_score: f32,
}

impl MockPoseModel {
    pub fn new() -> Self {
        Self {
            behavior: MockBehavior::Healthy,
            keypoint_score: 0.9,
        }
    }

    /// Simulates a model that was never loaded; every call is fatal.
    pub fn not_ready() -> Self {
        Self {
            behavior: MockBehavior::NotReady,
            keypoint_score: 0.0,
        }
    }

    /// Simulates per-frame inference failures (non-fatal).
    pub fn always_failing() -> Self {
        Self {
            behavior: MockBehavior::AlwaysFailing,
            keypoint_score: 0.0,
        }
    }

    pub fn with_keypoint_score(score: f32) -> Self {
        Self {
            behavior: MockBehavior::Healthy,
            keypoint_score: score,
        }
    }
}

impl Default for MockPoseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseModel for MockPoseModel {
    fn estimate(&self, tensor: FrameTensor) -> Result<Pose, InferenceError> {
        match self.behavior {
            MockBehavior::NotReady => return Err(InferenceError::NotReady),
            MockBehavior::AlwaysFailing => {
                return Err(InferenceError::Backend("simulated failure".into()))
            }
            MockBehavior::Healthy => {}
        }

        if tensor.is_empty() {
            return Err(InferenceError::IncompatibleShape {
                width: tensor.width(),
                height: tensor.height(),
            });
        }

        let w = tensor.width() as f32;
        let h = tensor.height() as f32;

        // A fixed figure spread over the frame, a pure function of the
        // tensor shape so repeated runs agree.
        let keypoints = BodyPart::all()
            .iter()
            .map(|&part| {
                let i = part.index() as f32;
                let n = (BodyPart::COUNT - 1) as f32;
                Keypoint::new(
                    part,
                    w * (0.25 + 0.5 * i / n),
                    h * (0.1 + 0.8 * i / n),
                    self.keypoint_score,
                )
            })
            .collect();

        Ok(Pose::new(keypoints, self.keypoint_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn tensor(w: u32, h: u32) -> FrameTensor {
        FrameTensor::from_rgb(RgbImage::new(w, h))
    }

    #[test]
    fn test_mock_produces_full_keypoint_set() {
        let model = MockPoseModel::new();
        let pose = model.estimate(tensor(640, 480)).unwrap();

        assert_eq!(pose.keypoints.len(), BodyPart::COUNT);
        for kp in &pose.keypoints {
            assert!(kp.x >= 0.0 && kp.x <= 640.0);
            assert!(kp.y >= 0.0 && kp.y <= 480.0);
        }
    }

    #[test]
    fn test_mock_is_deterministic() {
        let model = MockPoseModel::new();
        let a = model.estimate(tensor(320, 240)).unwrap();
        let b = model.estimate(tensor(320, 240)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_not_ready_is_fatal() {
        let model = MockPoseModel::not_ready();
        let err = model.estimate(tensor(64, 64)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_backend_failure_is_frame_local() {
        let model = MockPoseModel::always_failing();
        let err = model.estimate(tensor(64, 64)).unwrap_err();
        assert!(!err.is_fatal());
    }
}
