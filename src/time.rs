//! Integer time values
//!
//! All timeline arithmetic runs on whole microseconds so that durations add
//! up exactly no matter how many slices and concatenations are chained.
//! Floating-point seconds only appear at the API boundary and in the text
//! handed to external tools.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ticks per second (1 tick = 1 microsecond)
pub const TICKS_PER_SECOND: u64 = 1_000_000;

/// A non-negative point or span on a timeline, in microseconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timecode(u64);

impl Timecode {
    pub const ZERO: Timecode = Timecode(0);
    /// Largest representable time, about 584,000 years
    pub const MAX: Timecode = Timecode(u64::MAX);

    /// Create from a raw microsecond count
    pub const fn from_micros(micros: u64) -> Self {
        Timecode(micros)
    }

    /// Create from whole seconds
    pub const fn from_secs(secs: u64) -> Self {
        Timecode(secs * TICKS_PER_SECOND)
    }

    /// Create from fractional seconds, rounded to the nearest microsecond.
    ///
    /// Negative and NaN inputs clamp to zero; inputs past [`Timecode::MAX`]
    /// clamp to it.
    pub fn from_secs_f64(secs: f64) -> Self {
        Timecode((secs * TICKS_PER_SECOND as f64).round() as u64)
    }

    /// Create from a frame count at the given sample rate
    pub fn from_frames(frames: u64, sample_rate: u32) -> Self {
        if sample_rate == 0 {
            return Timecode::ZERO;
        }
        let micros = (frames as u128 * TICKS_PER_SECOND as u128) / sample_rate as u128;
        Timecode(micros as u64)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Timecode) -> Option<Timecode> {
        self.0.checked_add(rhs.0).map(Timecode)
    }

    pub fn saturating_add(self, rhs: Timecode) -> Timecode {
        Timecode(self.0.saturating_add(rhs.0))
    }

    pub fn checked_sub(self, rhs: Timecode) -> Option<Timecode> {
        self.0.checked_sub(rhs.0).map(Timecode)
    }

    pub fn saturating_sub(self, rhs: Timecode) -> Timecode {
        Timecode(self.0.saturating_sub(rhs.0))
    }
}

impl From<f64> for Timecode {
    fn from(secs: f64) -> Self {
        Timecode::from_secs_f64(secs)
    }
}

impl From<Duration> for Timecode {
    fn from(duration: Duration) -> Self {
        Timecode(duration.as_micros() as u64)
    }
}

impl From<Timecode> for Duration {
    fn from(tc: Timecode) -> Self {
        Duration::from_micros(tc.0)
    }
}

impl Add for Timecode {
    type Output = Timecode;

    fn add(self, rhs: Timecode) -> Timecode {
        Timecode(self.0 + rhs.0)
    }
}

impl AddAssign for Timecode {
    fn add_assign(&mut self, rhs: Timecode) {
        self.0 += rhs.0;
    }
}

impl Sub for Timecode {
    type Output = Timecode;

    fn sub(self, rhs: Timecode) -> Timecode {
        Timecode(self.0 - rhs.0)
    }
}

impl Mul<u64> for Timecode {
    type Output = Timecode;

    fn mul(self, rhs: u64) -> Timecode {
        Timecode(self.0 * rhs)
    }
}

impl Div<u64> for Timecode {
    type Output = Timecode;

    fn div(self, rhs: u64) -> Timecode {
        Timecode(self.0 / rhs)
    }
}

impl Sum for Timecode {
    fn sum<I: Iterator<Item = Timecode>>(iter: I) -> Timecode {
        iter.fold(Timecode::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Timecode> for Timecode {
    fn sum<I: Iterator<Item = &'a Timecode>>(iter: I) -> Timecode {
        iter.copied().sum()
    }
}

/// Decimal seconds without trailing zeros (`1.5`, `2`, `0.000001`)
impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / TICKS_PER_SECOND;
        let frac = self.0 % TICKS_PER_SECOND;
        if frac == 0 {
            return write!(f, "{}", secs);
        }
        let digits = format!("{:06}", frac);
        write!(f, "{}.{}", secs, digits.trim_end_matches('0'))
    }
}
