//! Render Module
//!
//! Materializes a timeline into an audio file by driving an external mixer
//! and transcoder:
//! - Tool commands and the process runner
//! - Mixer batching
//! - Render-scoped scratch storage
//! - Configuration

mod batch;
mod command;
mod config;
mod renderer;
mod scratch;

pub use batch::{flush_before, MixBatch, MixTrack, MAX_TRACKS_PER_BATCH};
pub use command::{find_program, CancelToken, CommandRunner, SystemRunner, ToolCommand};
pub use config::{RenderConfig, RenderOptions, MIXER_ENV, SCRATCH_DIR_ENV, TRANSCODER_ENV};
pub use renderer::{cache_key, Renderer, MIX_FILE_NAME, SILENCE_FILE_NAME};
pub use scratch::{ScratchDir, SCRATCH_PREFIX};
