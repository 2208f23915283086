//! Mixer batching
//!
//! The mixer accepts a limited number of tracks per invocation. Directives
//! accumulate in a [`MixBatch`] and run together; a batch is flushed before
//! the directive of every fragment whose index is a non-zero multiple of
//! [`MAX_TRACKS_PER_BATCH`].

use std::path::{Path, PathBuf};

use super::command::ToolCommand;
use crate::time::Timecode;

/// Mixer track limit per invocation
pub const MAX_TRACKS_PER_BATCH: usize = 80;

/// Whether the pending batch must run before fragment `index` is appended
pub fn flush_before(index: usize) -> bool {
    index != 0 && index % MAX_TRACKS_PER_BATCH == 0
}

/// One fragment's mix directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixTrack {
    /// Fragment index in the timeline, used as the mixer chain name
    pub index: usize,
    /// Intermediate-format file to read from
    pub input: PathBuf,
    pub start: Timecode,
    pub duration: Timecode,
    pub reversed: bool,
    /// Where in the output the region is written
    pub position: Timecode,
}

impl MixTrack {
    /// `-a:<index> -i:[reverse,]select,<start>,<duration>,<input> -o:<output> -y:<position>`
    fn directive(&self, output: &Path) -> [String; 4] {
        let reverse = if self.reversed { "reverse," } else { "" };
        [
            format!("-a:{}", self.index),
            format!(
                "-i:{}select,{},{},{}",
                reverse,
                self.start,
                self.duration,
                self.input.display()
            ),
            format!("-o:{}", output.display()),
            format!("-y:{}", self.position),
        ]
    }
}

/// Pending mix directives for one mixer invocation
#[derive(Debug, Clone)]
pub struct MixBatch {
    program: String,
    output: PathBuf,
    tracks: Vec<MixTrack>,
}

impl MixBatch {
    /// An empty batch that writes into `output`
    pub fn new(program: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output: output.into(),
            tracks: Vec::with_capacity(MAX_TRACKS_PER_BATCH),
        }
    }

    pub fn push(&mut self, track: MixTrack) {
        self.tracks.push(track);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// The mixer invocation for the pending tracks
    pub fn to_command(&self) -> ToolCommand {
        self.tracks
            .iter()
            .fold(ToolCommand::new(self.program.clone()), |cmd, track| {
                cmd.args(track.directive(&self.output))
            })
    }

    /// Build the command and leave the batch empty
    pub fn take(&mut self) -> ToolCommand {
        let command = self.to_command();
        self.tracks.clear();
        command
    }
}
