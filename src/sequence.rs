//! Step sequencer
//!
//! A pattern string is read one symbol per step. Each symbol is looked up in
//! a palette of timelines and fitted to exactly one step: longer material is
//! cut, shorter material is padded with trailing silence, and symbols with no
//! palette entry become a silent step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapecutError};
use crate::time::Timecode;
use crate::timeline::Timeline;

/// Step pattern plus step length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SequenceRepr")]
pub struct Sequence {
    pattern: Vec<char>,
    step: Timecode,
}

impl Sequence {
    /// Create a sequence from a pattern string such as `"x-x-xx--"`.
    ///
    /// # Errors
    /// * `InvalidArgument` - If `step` is zero, or if the whole sequence is
    ///   longer than the largest representable time
    pub fn new(pattern: &str, step: impl Into<Timecode>) -> Result<Self> {
        Self::from_symbols(pattern.chars().collect(), step.into())
    }

    fn from_symbols(pattern: Vec<char>, step: Timecode) -> Result<Self> {
        if step.is_zero() {
            return Err(TapecutError::invalid_argument(
                "sequence step duration must be positive",
            ));
        }
        if step.as_micros().checked_mul(pattern.len() as u64).is_none() {
            return Err(TapecutError::invalid_argument(
                "sequence is longer than the largest representable time",
            ));
        }

        Ok(Self { pattern, step })
    }

    pub fn pattern(&self) -> &[char] {
        &self.pattern
    }

    pub fn step(&self) -> Timecode {
        self.step
    }

    /// Total length of any timeline this sequence produces
    pub fn duration(&self) -> Timecode {
        self.step * self.pattern.len() as u64
    }

    /// Build the timeline: one step per pattern symbol, in order
    pub fn apply(&self, palette: &HashMap<char, Timeline>) -> Result<Timeline> {
        let mut result = Timeline::new();

        for symbol in &self.pattern {
            match palette.get(symbol) {
                Some(material) => result.concat(&self.fit(material)?),
                None => result.concat(&Timeline::silence(self.step)),
            };
        }

        Ok(result)
    }

    fn fit(&self, material: &Timeline) -> Result<Timeline> {
        let length = material.duration();
        if self.step > length {
            Ok(material + &Timeline::silence(self.step - length))
        } else {
            material.slice(Timecode::ZERO, self.step)
        }
    }
}

#[derive(Deserialize)]
struct SequenceRepr {
    pattern: Vec<char>,
    step: Timecode,
}

impl TryFrom<SequenceRepr> for Sequence {
    type Error = TapecutError;

    fn try_from(repr: SequenceRepr) -> Result<Self> {
        Sequence::from_symbols(repr.pattern, repr.step)
    }
}
