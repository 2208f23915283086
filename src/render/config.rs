//! Render configuration
//!
//! Tool names and the scratch location, with environment overrides.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Overrides the mixer program (default `ecasound`)
pub const MIXER_ENV: &str = "TAPECUT_MIXER";
/// Overrides the transcoder program (default `ffmpeg`)
pub const TRANSCODER_ENV: &str = "TAPECUT_TRANSCODER";
/// Overrides the directory that per-render scratch directories are created in
pub const SCRATCH_DIR_ENV: &str = "TAPECUT_SCRATCH_DIR";

/// External tools and scratch location used by a renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Multi-track mixer program
    pub mixer: String,
    /// Format conversion program
    pub transcoder: String,
    /// Parent directory for per-render scratch directories
    pub scratch_root: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            mixer: "ecasound".to_string(),
            transcoder: "ffmpeg".to_string(),
            scratch_root: env::temp_dir(),
        }
    }
}

impl RenderConfig {
    /// Defaults, overridden by `TAPECUT_MIXER`, `TAPECUT_TRANSCODER` and
    /// `TAPECUT_SCRATCH_DIR` when set
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = RenderConfig::default();
        let set = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(mixer) = set(MIXER_ENV) {
            config.mixer = mixer;
        }
        if let Some(transcoder) = set(TRANSCODER_ENV) {
            config.transcoder = transcoder;
        }
        if let Some(dir) = set(SCRATCH_DIR_ENV) {
            config.scratch_root = PathBuf::from(dir);
        }

        config
    }

    pub fn with_mixer(mut self, mixer: impl Into<String>) -> Self {
        self.mixer = mixer.into();
        self
    }

    pub fn with_transcoder(mut self, transcoder: impl Into<String>) -> Self {
        self.transcoder = transcoder.into();
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }
}

/// Per-call render options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Replace the destination if it already exists
    pub overwrite: bool,
}

impl RenderOptions {
    /// Options that replace an existing destination
    pub fn overwrite() -> Self {
        RenderOptions { overwrite: true }
    }
}
