//! Fragment - an immutable reference into a source
//!
//! A fragment names a source, a start offset, a duration and a play
//! direction. It never changes after construction; the algebra derives new
//! fragments instead.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapecutError};
use crate::time::Timecode;

/// Where a fragment's audio comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A sound file on disk
    File(PathBuf),
    /// The built-in silent clip, materialized by the renderer
    Silence,
}

impl Source {
    /// Path of a file source, `None` for silence
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::File(path) => Some(path),
            Source::Silence => None,
        }
    }

    pub fn is_silence(&self) -> bool {
        matches!(self, Source::Silence)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::File(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::File(path.to_path_buf())
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::File(PathBuf::from(path))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Silence => write!(f, "<silence>"),
        }
    }
}

/// An immutable sub-range of a source with a play direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FragmentRepr")]
pub struct Fragment {
    source: Source,
    start: Timecode,
    duration: Timecode,
    reversed: bool,
}

impl Fragment {
    /// Create a fragment.
    ///
    /// # Errors
    /// * `InvalidArgument` - If `duration` is zero, or if `start + duration`
    ///   is past [`Timecode::MAX`]
    pub fn new(
        source: impl Into<Source>,
        start: impl Into<Timecode>,
        duration: impl Into<Timecode>,
        reversed: bool,
    ) -> Result<Self> {
        let duration = duration.into();
        if duration.is_zero() {
            return Err(TapecutError::invalid_argument(
                "fragment duration must be positive",
            ));
        }

        let start = start.into();
        if start.checked_add(duration).is_none() {
            return Err(TapecutError::invalid_argument(
                "fragment ends past the largest representable time",
            ));
        }

        Ok(Self::from_parts(source.into(), start, duration, reversed))
    }

    /// Callers guarantee a positive duration and an end that fits in a
    /// `Timecode`.
    pub(crate) fn from_parts(
        source: Source,
        start: Timecode,
        duration: Timecode,
        reversed: bool,
    ) -> Self {
        debug_assert!(!duration.is_zero(), "zero-duration fragment");
        debug_assert!(start.checked_add(duration).is_some(), "fragment end overflows");
        Self {
            source,
            start,
            duration,
            reversed,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn start(&self) -> Timecode {
        self.start
    }

    pub fn duration(&self) -> Timecode {
        self.duration
    }

    /// Offset in the source just past the fragment.
    ///
    /// Never overflows: every fragment's end is checked at construction.
    pub fn end(&self) -> Timecode {
        self.start + self.duration
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// `length` ticks starting `offset` ticks into this fragment.
    ///
    /// Callers keep `offset + length` within this fragment's duration, so the
    /// new range ends no later than this one.
    pub(crate) fn sub_range(&self, offset: Timecode, length: Timecode) -> Self {
        Self::from_parts(self.source.clone(), self.start + offset, length, self.reversed)
    }

    /// Same range played in the other direction
    pub(crate) fn flipped(&self) -> Self {
        Self::from_parts(self.source.clone(), self.start, self.duration, !self.reversed)
    }
}

#[derive(Deserialize)]
struct FragmentRepr {
    source: Source,
    start: Timecode,
    duration: Timecode,
    #[serde(default)]
    reversed: bool,
}

impl TryFrom<FragmentRepr> for Fragment {
    type Error = TapecutError;

    fn try_from(repr: FragmentRepr) -> Result<Self> {
        Fragment::new(repr.source, repr.start, repr.duration, repr.reversed)
    }
}
