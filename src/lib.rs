//! Tapecut - Audio Timeline Algebra
//!
//! Tapecut edits audio by arithmetic over timelines. A timeline is an
//! ordered list of fragments, each one a region of a source file (or of
//! built-in silence), optionally played backwards. Editing operations never
//! touch audio: they build new timelines out of existing fragments.
//!
//! # Architecture
//!
//! - `time`: integer-tick durations and positions
//! - `timeline`: fragments and the timeline algebra (slice, concat, loop,
//!   split, fill, replace, reverse, silence)
//! - `sequence`: step patterns over named timelines
//! - `probe`: source format detection and duration probing
//! - `render`: materializes a timeline through an external mixer and
//!   transcoder
//!
//! Only rendering touches the filesystem or spawns processes.

pub mod error;
pub mod probe;
pub mod render;
pub mod sequence;
pub mod time;
pub mod timeline;

pub use error::{Result, TapecutError};
pub use probe::{FileProbe, SourceFormat, SourceProbe};
pub use render::{CancelToken, CommandRunner, RenderConfig, RenderOptions, Renderer};
pub use sequence::Sequence;
pub use time::Timecode;
pub use timeline::{Fragment, Source, Timeline};
