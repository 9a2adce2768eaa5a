//! Frame sampling: probes the source video and extracts an ordered, bounded
//! set of letterboxed still frames into the invocation's working area.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};

use super::config::{SamplingMode, SamplingPolicy};
use super::error::PipelineError;
use super::workdir::WorkingArea;

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXT: &str = "jpg";

/// An opened input video. The reference is opaque to the pipeline; the file
/// itself is never deleted, only this handle is dropped when the invocation
/// ends.
#[derive(Debug, Clone)]
pub struct VideoSource {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub container: String,
}

/// One extracted still frame, owning its temporary on-disk artifact.
///
/// Consumed exactly once by the decoder, which removes the file as soon as
/// it has been read. Not `Clone`: two owners of the same artifact would
/// break that contract.
#[derive(Debug)]
pub struct ExtractedFrame {
    pub index: u32,
    pub timestamp_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub path: PathBuf,
}

/// Deterministic sampling timestamps for one `(duration, policy)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlan {
    timestamps: Vec<f64>,
    fps_filter: f64,
}

impl SamplePlan {
    pub fn new(policy: &SamplingPolicy, duration_seconds: f64) -> Self {
        match policy.mode {
            SamplingMode::FixedFps { fps } => {
                let count = (duration_seconds * fps).floor() as usize;
                Self {
                    timestamps: (0..count).map(|i| i as f64 / fps).collect(),
                    fps_filter: fps,
                }
            }
            SamplingMode::FixedCount { frame_count } => {
                let count = frame_count as usize;
                Self {
                    timestamps: (0..count)
                        .map(|i| i as f64 * duration_seconds / count as f64)
                        .collect(),
                    fps_filter: count as f64 / duration_seconds,
                }
            }
        }
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Value for ffmpeg's `fps=` filter reproducing this plan's cadence.
    pub fn fps_filter(&self) -> f64 {
        self.fps_filter
    }
}

/// Opens and probes the source video. Unopenable or unprobeable inputs
/// (zero-byte uploads, non-video files) fail here, before any frame work.
pub fn probe(path: &Path) -> Result<VideoSource, PipelineError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=format_name,duration",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| PipelineError::Extraction(format!("ffprobe failed to start: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Extraction(format!(
            "cannot open video {:?}: {}",
            path,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let (container, duration_seconds) = parse_probe_output(&stdout).ok_or_else(|| {
        PipelineError::Extraction(format!("cannot determine duration of {path:?}"))
    })?;

    debug!("probed {path:?}: container={container} duration={duration_seconds:.3}s");
    Ok(VideoSource {
        path: path.to_path_buf(),
        duration_seconds,
        container,
    })
}

/// Parses `key=value` lines from ffprobe. Requires a finite, positive
/// duration; anything else means the input is not a usable video.
fn parse_probe_output(stdout: &str) -> Option<(String, f64)> {
    let mut container = String::new();
    let mut duration = None;

    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("format_name=") {
            container = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("duration=") {
            duration = value.trim().parse::<f64>().ok();
        }
    }

    let duration = duration?;
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some((container, duration))
}

/// Extracts the planned frames into `workdir`, letterboxed to the policy's
/// target resolution. Blocks until every frame is on disk or the extraction
/// failed as a whole; there is no per-frame callback surface.
pub fn sample(
    video: &VideoSource,
    policy: &SamplingPolicy,
    workdir: &WorkingArea,
) -> Result<Vec<ExtractedFrame>, PipelineError> {
    let plan = SamplePlan::new(policy, video.duration_seconds);
    if plan.is_empty() {
        return Err(PipelineError::Extraction(format!(
            "sampling plan yields zero frames for a {:.3}s video",
            video.duration_seconds
        )));
    }

    let w = policy.target_width;
    let h = policy.target_height;
    let filter = format!(
        "fps={:.6},scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        plan.fps_filter()
    );
    let pattern = workdir.path().join(format!("{FRAME_PREFIX}%05d.{FRAME_EXT}"));

    info!(
        "invocation {}: extracting {} frames from {:?}",
        workdir.invocation_id(),
        plan.frame_count(),
        video.path
    );

    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(&video.path)
        .args(["-vf", &filter, "-start_number", "0"])
        .args(["-frames:v", &plan.frame_count().to_string()])
        .arg(&pattern)
        .output()
        .map_err(|e| PipelineError::Extraction(format!("ffmpeg failed to start: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Extraction(format!(
            "ffmpeg extraction failed: {}",
            stderr.trim()
        )));
    }

    collect_frames(workdir.path(), &plan, policy)
}

/// Rebuilds frame order from the directory listing. Filenames are
/// zero-padded, so lexicographic order is frame order; the index is carried
/// explicitly on each frame from here on.
pub fn collect_frames(
    dir: &Path,
    plan: &SamplePlan,
    policy: &SamplingPolicy,
) -> Result<Vec<ExtractedFrame>, PipelineError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FRAME_PREFIX) && n.ends_with(FRAME_EXT))
        })
        .collect();
    paths.sort();

    if paths.len() > plan.frame_count() {
        // the fps filter can emit one extra frame at the tail
        for extra in paths.drain(plan.frame_count()..) {
            let _ = std::fs::remove_file(extra);
        }
    } else if paths.len() < plan.frame_count() {
        warn!(
            "expected {} frames, extractor produced {}",
            plan.frame_count(),
            paths.len()
        );
    }

    if paths.is_empty() {
        return Err(PipelineError::Extraction(
            "video yielded zero valid frames".into(),
        ));
    }

    Ok(paths
        .into_iter()
        .zip(plan.timestamps())
        .enumerate()
        .map(|(index, (path, &timestamp_seconds))| ExtractedFrame {
            index: index as u32,
            timestamp_seconds,
            width: policy.target_width,
            height: policy.target_height,
            path,
        })
        .collect())
}
