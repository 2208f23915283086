//! Render-scoped scratch directory
//!
//! Each render gets its own uniquely named directory under the scratch root.
//! The directory and everything in it is removed when the guard drops, on
//! the success path and on every error path alike.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// Name prefix of every scratch directory
pub const SCRATCH_PREFIX: &str = "tapecut-";

/// Owns a scratch directory for the lifetime of one render
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh `tapecut-*` directory inside `root`, creating `root`
    /// first if needed
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch directory"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch directory"
            ),
        }
    }
}
