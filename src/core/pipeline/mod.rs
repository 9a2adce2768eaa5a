//! Video assessment pipeline: sample → decode → estimate → assemble.
//!
//! Sampling streams from one video decoder and is sequential; decode and
//! pose inference for distinct frames are independent and run on a bounded
//! worker pool. Per-frame failures drop that frame and the pipeline degrades
//! to a partial sequence; extraction failures, an unusable model, and an
//! empty result abort the invocation.

pub mod assembler;
pub mod config;
pub mod decoder;
pub mod error;
pub mod sampler;
pub mod tensor;
pub mod workdir;

pub use config::{ConfigError, PipelineConfig, SamplingMode, SamplingPolicy};
pub use error::{DecodeError, FrameError, PipelineError};
pub use sampler::{ExtractedFrame, SamplePlan, VideoSource};
pub use tensor::FrameTensor;
pub use workdir::WorkingArea;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::Serialize;

use crate::core::pose::model::PoseModel;
use crate::core::pose::sequence::{FramePose, KeypointSequence, Pose};

/// Cooperative cancellation flag for one invocation. Cancelling abandons
/// frames that have not started; in-flight frames finish on their own. The
/// working area is reclaimed either way.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub frames_sampled: usize,
    pub frames_analyzed: usize,
    pub frames_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub sequence: KeypointSequence,
    pub stats: PipelineStats,
}

/// Runs the whole pipeline for one uploaded video.
///
/// Blocking: callers on a shared event loop should hand this to a blocking
/// worker. The working area lives exactly as long as this call, so frame
/// artifacts are reclaimed on success, partial failure, total failure and
/// cancellation alike.
pub fn run(
    video_path: &Path,
    policy: &SamplingPolicy,
    model: &dyn PoseModel,
    max_workers: usize,
    cancel: &CancelToken,
) -> Result<PipelineOutput, PipelineError> {
    policy.validate()?;

    let video = sampler::probe(video_path)?;
    let workdir = WorkingArea::create()?;
    let frames = sampler::sample(&video, policy, &workdir)?;

    let result = process_frames(frames, model, max_workers, cancel);
    drop(workdir);
    result
}

/// Decode + inference fan-out over already extracted frames, then assembly.
///
/// The pool is capped: pose inference is the dominant per-frame cost and is
/// memory-hungry, so fan-out must stay bounded even under many simultaneous
/// uploads. Output order never depends on completion order.
pub fn process_frames(
    frames: Vec<ExtractedFrame>,
    model: &dyn PoseModel,
    max_workers: usize,
    cancel: &CancelToken,
) -> Result<PipelineOutput, PipelineError> {
    let frames_sampled = frames.len();
    let fatal: OnceCell<String> = OnceCell::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .build()
        .map_err(|e| PipelineError::Worker(e.to_string()))?;

    let poses: Vec<FramePose> = pool.install(|| {
        frames
            .into_par_iter()
            .filter_map(|frame| {
                if cancel.is_cancelled() || fatal.get().is_some() {
                    return None;
                }
                let index = frame.index;
                let timestamp = frame.timestamp_seconds;
                match process_one(frame, model) {
                    Ok(pose) => Some(FramePose::from_pose(pose, index, timestamp)),
                    Err(FrameError::Inference(err)) if err.is_fatal() => {
                        let _ = fatal.set(err.to_string());
                        None
                    }
                    Err(err) => {
                        warn!("dropping frame {index}: {err}");
                        None
                    }
                }
            })
            .collect()
    });

    if let Some(reason) = fatal.get() {
        return Err(PipelineError::ModelUnavailable(reason.clone()));
    }
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let frames_analyzed = poses.len();
    let stats = PipelineStats {
        frames_sampled,
        frames_analyzed,
        frames_dropped: frames_sampled - frames_analyzed,
    };
    info!(
        "pipeline finished: {}/{} frames analyzed",
        stats.frames_analyzed, stats.frames_sampled
    );

    let sequence = assembler::assemble(poses)?;
    Ok(PipelineOutput { sequence, stats })
}

/// One frame end to end. The tensor moves into the estimator and is freed
/// there on both paths; the frame artifact is already gone after decode.
fn process_one(frame: ExtractedFrame, model: &dyn PoseModel) -> Result<Pose, FrameError> {
    let tensor = decoder::decode(frame)?;
    let pose = model.estimate(tensor)?;
    Ok(pose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pose::keypoint::BodyPart;
    use crate::core::pose::model::MockPoseModel;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn write_frame(dir: &Path, index: u32, w: u32, h: u32) -> ExtractedFrame {
        let img = RgbImage::from_pixel(w, h, Rgb([30, 60, 90]));
        let path = dir.join(format!("frame_{index:05}.jpg"));
        img.save(&path).unwrap();
        ExtractedFrame {
            index,
            timestamp_seconds: index as f64,
            width: w,
            height: h,
            path,
        }
    }

    fn write_corrupt_frame(dir: &Path, index: u32, w: u32, h: u32) -> ExtractedFrame {
        let path = dir.join(format!("frame_{index:05}.jpg"));
        std::fs::write(&path, b"garbage bytes").unwrap();
        ExtractedFrame {
            index,
            timestamp_seconds: index as f64,
            width: w,
            height: h,
            path,
        }
    }

    #[test]
    fn test_full_success_ten_frames() {
        let area = WorkingArea::create().unwrap();
        let frames: Vec<_> = (0..10).map(|i| write_frame(area.path(), i, 64, 48)).collect();

        let model = MockPoseModel::new();
        let output = process_frames(frames, &model, 2, &CancelToken::new()).unwrap();

        assert_eq!(output.sequence.len(), 10);
        assert_eq!(output.sequence.frame_indices(), (0..10).collect::<Vec<_>>());
        for pose in output.sequence.iter() {
            assert_eq!(pose.keypoints.len(), BodyPart::COUNT);
        }
        assert_eq!(
            output.stats,
            PipelineStats {
                frames_sampled: 10,
                frames_analyzed: 10,
                frames_dropped: 0
            }
        );
    }

    #[test]
    fn test_corrupt_frame_leaves_gap() {
        let area = WorkingArea::create().unwrap();
        let frames: Vec<_> = (0..5)
            .map(|i| {
                if i == 2 {
                    write_corrupt_frame(area.path(), i, 64, 48)
                } else {
                    write_frame(area.path(), i, 64, 48)
                }
            })
            .collect();

        let model = MockPoseModel::new();
        let output = process_frames(frames, &model, 2, &CancelToken::new()).unwrap();

        assert_eq!(output.sequence.len(), 4);
        assert!(!output.sequence.contains_index(2));
        assert_eq!(output.sequence.frame_indices(), vec![0, 1, 3, 4]);
        assert_eq!(output.stats.frames_dropped, 1);
    }

    #[test]
    fn test_all_frames_failing_inference_is_empty_sequence_not_success() {
        let area = WorkingArea::create().unwrap();
        let frames: Vec<_> = (0..4).map(|i| write_frame(area.path(), i, 32, 32)).collect();

        let model = MockPoseModel::always_failing();
        let err = process_frames(frames, &model, 2, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptySequence));
    }

    #[test]
    fn test_model_not_ready_is_fatal() {
        let area = WorkingArea::create().unwrap();
        let frames: Vec<_> = (0..4).map(|i| write_frame(area.path(), i, 32, 32)).collect();

        let model = MockPoseModel::not_ready();
        let err = process_frames(frames, &model, 2, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::ModelUnavailable(_)));
    }

    #[test]
    fn test_cancelled_invocation_reports_cancelled() {
        let area = WorkingArea::create().unwrap();
        let frames: Vec<_> = (0..4).map(|i| write_frame(area.path(), i, 32, 32)).collect();

        let cancel = CancelToken::new();
        cancel.cancel();

        let model = MockPoseModel::new();
        let err = process_frames(frames, &model, 2, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn test_working_area_reclaimed_on_every_outcome() {
        let model_ok = MockPoseModel::new();
        let model_bad = MockPoseModel::always_failing();
        let cancel = CancelToken::new();
        cancel.cancel();

        // success
        let path = {
            let area = WorkingArea::create().unwrap();
            let frames = vec![write_frame(area.path(), 0, 32, 32)];
            process_frames(frames, &model_ok, 1, &CancelToken::new()).unwrap();
            area.path().to_path_buf()
        };
        assert!(!path.exists());

        // total failure
        let path = {
            let area = WorkingArea::create().unwrap();
            let frames = vec![write_frame(area.path(), 0, 32, 32)];
            process_frames(frames, &model_bad, 1, &CancelToken::new()).unwrap_err();
            area.path().to_path_buf()
        };
        assert!(!path.exists());

        // cancellation: frames never consumed, still reclaimed
        let path = {
            let area = WorkingArea::create().unwrap();
            let frames = vec![write_frame(area.path(), 0, 32, 32)];
            process_frames(frames, &model_ok, 1, &cancel).unwrap_err();
            area.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_repeated_runs_agree_on_length() {
        let model = MockPoseModel::new();

        let run_once = || {
            let area = WorkingArea::create().unwrap();
            let frames: Vec<_> = (0..6).map(|i| write_frame(area.path(), i, 48, 48)).collect();
            process_frames(frames, &model, 3, &CancelToken::new()).unwrap()
        };

        let a = run_once();
        let b = run_once();
        assert_eq!(a.sequence.len(), b.sequence.len());
        assert_eq!(a.sequence.frame_indices(), b.sequence.frame_indices());
    }
}
