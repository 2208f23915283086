//! Timeline Module
//!
//! Fragments, the timeline composition algebra and built-in silence.

mod fragment;
mod ops;
mod silence;

pub use fragment::{Fragment, Source};
pub use ops::Timeline;
pub use silence::{write_silence_clip, SILENCE_CLIP_LENGTH, SILENCE_SAMPLE_RATE};
