use serde::{Deserialize, Serialize};

use super::keypoint::Keypoint;

/// Raw estimator output for one frame: the model-defined keypoint set plus an
/// overall pose confidence. Carries no frame identity; the pipeline attaches
/// index and timestamp when it builds a [`FramePose`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    pub score: f32,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>, score: f32) -> Self {
        Self { keypoints, score }
    }

    pub fn mean_keypoint_score(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|kp| kp.score).sum();
        sum / self.keypoints.len() as f32
    }
}

/// The pose detected for one sampled frame, tagged with the frame's original
/// index and timestamp so gaps stay detectable downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePose {
    pub frame_index: u32,
    pub timestamp_seconds: f64,
    pub keypoints: Vec<Keypoint>,
    #[serde(rename = "poseScore")]
    pub score: f32,
}

impl FramePose {
    pub fn from_pose(pose: Pose, frame_index: u32, timestamp_seconds: f64) -> Self {
        Self {
            frame_index,
            timestamp_seconds,
            keypoints: pose.keypoints,
            score: pose.score,
        }
    }
}

/// Ordered per-frame poses, one entry per successfully processed frame.
///
/// Frames that failed decode or inference are simply absent; index alignment
/// to the original sampling is preserved through `frame_index`, not by array
/// position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeypointSequence {
    frames: Vec<FramePose>,
}

impl KeypointSequence {
    /// `frames` must already be sorted by `frame_index` ascending.
    pub(crate) fn from_ordered(frames: Vec<FramePose>) -> Self {
        debug_assert!(frames.windows(2).all(|w| w[0].frame_index < w[1].frame_index));
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[FramePose] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &FramePose> {
        self.frames.iter()
    }

    /// Looks up a pose by its original frame index.
    pub fn get(&self, frame_index: u32) -> Option<&FramePose> {
        self.frames
            .binary_search_by_key(&frame_index, |f| f.frame_index)
            .ok()
            .map(|i| &self.frames[i])
    }

    pub fn contains_index(&self, frame_index: u32) -> bool {
        self.get(frame_index).is_some()
    }

    pub fn frame_indices(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.frame_index).collect()
    }
}
