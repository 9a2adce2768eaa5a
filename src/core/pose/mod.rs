pub mod keypoint;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod sequence;

pub use keypoint::{BodyPart, Keypoint};
pub use model::{InferenceError, MockPoseModel, PoseModel};
#[cfg(feature = "onnx")]
pub use onnx::OnnxPoseModel;
pub use sequence::{FramePose, KeypointSequence, Pose};
