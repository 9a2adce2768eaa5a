//! YOLOv8-pose backend via ONNX Runtime.
//!
//! Loaded once per handle and reused across frames and invocations; model
//! load dominates the fixed cost, so it never happens per frame.

use std::path::Path;
use std::sync::Mutex;

use log::{debug, info};
use ndarray::Array4;
use once_cell::sync::OnceCell;
use ort::session::Session;
use ort::value::TensorRef;

use crate::core::pipeline::tensor::FrameTensor;

use super::keypoint::{BodyPart, Keypoint};
use super::model::{InferenceError, PoseModel};
use super::sequence::Pose;

static ORT_INIT: OnceCell<()> = OnceCell::new();

fn ensure_runtime() {
    ORT_INIT.get_or_init(|| {
        let _ = ort::init().with_name("pose-pipeline").commit();
    });
}

/// Single-pose estimator backed by a YOLOv8-pose ONNX export.
///
/// `Session::run` needs exclusive access, so the session sits behind a
/// mutex; the handle itself is shared freely across invocations.
pub struct OnnxPoseModel {
    session: Mutex<Session>,
    input_size: u32,
}

impl OnnxPoseModel {
    pub const DEFAULT_INPUT_SIZE: u32 = 640;

    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, InferenceError> {
        Self::load_with_input_size(model_path, Self::DEFAULT_INPUT_SIZE)
    }

    pub fn load_with_input_size<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
    ) -> Result<Self, InferenceError> {
        ensure_runtime();
        info!("loading pose model from {:?}", model_path.as_ref());

        let session = Session::builder()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        info!("pose model loaded");
        Ok(Self {
            session: Mutex::new(session),
            input_size,
        })
    }

    /// CHW float input at the model's resolution. Sampling resolution is
    /// decoupled from model resolution: mismatched tensors are resized here
    /// instead of rejected.
    fn preprocess(&self, tensor: &FrameTensor) -> Array4<f32> {
        let size = self.input_size;
        let img = tensor.to_rgb8();
        let resized = if tensor.width() == size && tensor.height() == size {
            img
        } else {
            image::imageops::resize(&img, size, size, image::imageops::FilterType::Triangle)
        };

        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for y in 0..size as usize {
            for x in 0..size as usize {
                let pixel = resized.get_pixel(x as u32, y as u32);
                input[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
                input[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
                input[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
            }
        }
        input
    }
}

impl PoseModel for OnnxPoseModel {
    fn estimate(&self, tensor: FrameTensor) -> Result<Pose, InferenceError> {
        if tensor.is_empty() {
            return Err(InferenceError::IncompatibleShape {
                width: tensor.width(),
                height: tensor.height(),
            });
        }

        let frame_w = tensor.width() as f32;
        let frame_h = tensor.height() as f32;
        let input = self.preprocess(&tensor);
        drop(tensor);

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Backend("session lock poisoned".into()))?;

        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        // YOLOv8-pose output: (1, 56, anchors) where the 56 features are
        // 4 box coords + 1 objectness + 17 keypoints * (x, y, visibility).
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        let dims = shape.as_ref();
        if dims.len() != 3 || dims[1] as usize != 5 + BodyPart::COUNT * 3 {
            return Err(InferenceError::Backend(format!(
                "unexpected output shape {dims:?}"
            )));
        }
        let num_features = dims[1] as usize;
        let num_anchors = dims[2] as usize;
        if num_anchors == 0 {
            return Err(InferenceError::Backend("empty output tensor".into()));
        }

        let feature = |feature_idx: usize, anchor_idx: usize| {
            data[feature_idx * num_anchors + anchor_idx]
        };

        // Single-pose contract: take the highest-objectness anchor. No
        // confidence thresholding of the keypoints themselves.
        let mut best_anchor = 0;
        let mut best_score = f32::NEG_INFINITY;
        for anchor in 0..num_anchors {
            let score = feature(4, anchor);
            if score > best_score {
                best_score = score;
                best_anchor = anchor;
            }
        }
        debug!(
            "best anchor {best_anchor}/{num_anchors} (objectness {best_score:.3}, {num_features} features)"
        );

        let scale = self.input_size as f32;
        let keypoints = BodyPart::all()
            .iter()
            .map(|&part| {
                let base = 5 + part.index() * 3;
                let x_norm = (feature(base, best_anchor) / scale).clamp(0.0, 1.0);
                let y_norm = (feature(base + 1, best_anchor) / scale).clamp(0.0, 1.0);
                let score = feature(base + 2, best_anchor).clamp(0.0, 1.0);
                // map back into the sampled frame's pixel space
                Keypoint::new(part, x_norm * frame_w, y_norm * frame_h, score)
            })
            .collect();

        Ok(Pose::new(keypoints, best_score.clamp(0.0, 1.0)))
    }
}
