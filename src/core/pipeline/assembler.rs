use crate::core::pose::sequence::{FramePose, KeypointSequence};

use super::error::PipelineError;

/// Orders per-frame results by original frame index, whatever order the
/// workers finished in. Gaps from dropped frames stay gaps; nothing is
/// interpolated or null-padded. Zero survivors is a fatal outcome, distinct
/// from partial success.
pub fn assemble(mut poses: Vec<FramePose>) -> Result<KeypointSequence, PipelineError> {
    if poses.is_empty() {
        return Err(PipelineError::EmptySequence);
    }
    poses.sort_by_key(|p| p.frame_index);
    Ok(KeypointSequence::from_ordered(poses))
}
