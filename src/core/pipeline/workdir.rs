use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use tempfile::TempDir;

use super::error::PipelineError;

static NEXT_INVOCATION: AtomicU64 = AtomicU64::new(0);

/// Invocation-exclusive scratch directory for extracted frame files.
///
/// The invocation id in the prefix plus tempfile's random suffix keep
/// concurrent invocations from ever sharing a path, so zero-padded frame
/// filenames cannot collide across uploads. Dropping the area deletes the
/// directory and anything left in it; this runs on every exit path and is
/// the pipeline's cleanup guarantee, not a best-effort afterthought.
#[derive(Debug)]
pub struct WorkingArea {
    invocation_id: u64,
    dir: TempDir,
}

impl WorkingArea {
    pub fn create() -> Result<Self, PipelineError> {
        let invocation_id = NEXT_INVOCATION.fetch_add(1, Ordering::Relaxed);
        let dir = tempfile::Builder::new()
            .prefix(&format!("pose-{invocation_id}-"))
            .tempdir()?;
        debug!("working area {:?} created", dir.path());
        Ok(Self { invocation_id, dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn invocation_id(&self) -> u64 {
        self.invocation_id
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        // TempDir removes the directory itself; this hook only reports.
        if self.dir.path().exists() {
            debug!("working area {:?} reclaimed", self.dir.path());
        } else {
            warn!("working area {:?} vanished before cleanup", self.dir.path());
        }
    }
}
