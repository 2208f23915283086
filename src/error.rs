//! Error handling for Tapecut
//!
//! Validation errors are raised before any external process is spawned.
//! `CommandFailed` always carries the offending command line.

use std::path::PathBuf;

use thiserror::Error;

use crate::time::Timecode;

/// Result type alias for Tapecut operations
pub type Result<T> = std::result::Result<T, TapecutError>;

/// Main error type for Tapecut operations
#[derive(Error, Debug)]
pub enum TapecutError {
    // Render validation
    #[error("Destination already exists: {path}")]
    FileExists { path: PathBuf },

    #[error("Timeline has no fragments")]
    EmptyFragment,

    #[error("Range ends at {requested}s but the timeline is only {available}s long")]
    OutOfDuration {
        requested: Timecode,
        available: Timecode,
    },

    #[error("Unknown audio format: {path}")]
    UnknownFormat { path: PathBuf },

    #[error("Required program not found: {program}")]
    MissingDependency { program: String },

    // External tools
    #[error("Command failed ({}): {command}", status_text(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
    },

    #[error("Render cancelled{}", cancelled_text(.command))]
    Cancelled { command: Option<String> },

    // Arguments and sources
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Invalid audio file {path}: {reason}")]
    InvalidAudio { path: PathBuf, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn cancelled_text(command: &Option<String>) -> String {
    match command {
        Some(command) => format!(" while running: {}", command),
        None => String::new(),
    }
}

impl TapecutError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        TapecutError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TapecutError::FileExists { .. } => "FILE_EXISTS",
            TapecutError::EmptyFragment => "EMPTY_FRAGMENT",
            TapecutError::OutOfDuration { .. } => "OUT_OF_DURATION",
            TapecutError::UnknownFormat { .. } => "UNKNOWN_FORMAT",
            TapecutError::MissingDependency { .. } => "MISSING_DEPENDENCY",
            TapecutError::CommandFailed { .. } => "COMMAND_FAILED",
            TapecutError::Cancelled { .. } => "CANCELLED",
            TapecutError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            TapecutError::InvalidAudio { .. } => "INVALID_AUDIO",
            TapecutError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the error was raised before any external process ran
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TapecutError::FileExists { .. }
                | TapecutError::EmptyFragment
                | TapecutError::OutOfDuration { .. }
                | TapecutError::UnknownFormat { .. }
                | TapecutError::MissingDependency { .. }
                | TapecutError::InvalidArgument { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TapecutError::FileExists { .. } => vec![
                "Render with overwrite enabled to replace the file",
                "Choose a different destination path",
            ],
            TapecutError::EmptyFragment => {
                vec!["Open a source file or concatenate fragments before rendering"]
            }
            TapecutError::OutOfDuration { .. } => vec![
                "Check the timeline duration before slicing",
                "Use fill() to extend a timeline to the required length",
            ],
            TapecutError::UnknownFormat { .. } => vec![
                "Supported formats: WAV, MP3, FLAC, OGG",
                "Convert the file to WAV first",
            ],
            TapecutError::MissingDependency { .. } => vec![
                "Install ecasound and ffmpeg and make sure they are on PATH",
                "Point TAPECUT_MIXER or TAPECUT_TRANSCODER at the installed binaries",
            ],
            TapecutError::CommandFailed { .. } => vec![
                "Run the reported command by hand to see the tool's output",
                "Check that every fragment range lies inside its source file",
            ],
            _ => vec![],
        }
    }
}
