//! Timeline composition algebra
//!
//! Every operator returns a new Timeline except the two receiver-mutating
//! ones, [`Timeline::concat`] and [`Timeline::loop_in_place`].

use std::ops::{Add, AddAssign};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::fragment::Fragment;
use crate::error::{Result, TapecutError};
use crate::probe::{FileProbe, SourceProbe};
use crate::time::Timecode;

/// Ordered sequence of fragments, in playback order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    fragments: Vec<Fragment>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a whole source file as a single-fragment timeline
    ///
    /// # Errors
    /// * `UnknownFormat` - If the extension is not a supported format
    /// * `InvalidAudio` / `Io` - If the file cannot be probed
    /// * `InvalidArgument` - If the file has no playable audio
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &FileProbe)
    }

    /// Same as [`Timeline::open`] with an explicit probe
    pub fn open_with(path: impl AsRef<Path>, probe: &dyn SourceProbe) -> Result<Self> {
        let path = path.as_ref();
        let duration = probe.probe(path)?;
        let fragment = Fragment::new(path, Timecode::ZERO, duration, false)?;
        Ok(Self::from_fragments(vec![fragment]))
    }

    /// Assemble a timeline from explicit fragments
    pub fn from_fragments(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fragment> {
        self.fragments.iter()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Sum of all fragment durations, saturating at [`Timecode::MAX`]
    pub fn duration(&self) -> Timecode {
        self.fragments
            .iter()
            .fold(Timecode::ZERO, |total, f| total.saturating_add(f.duration()))
    }

    /// Sum of all fragment durations, or `None` if it does not fit in a
    /// `Timecode`
    pub fn checked_duration(&self) -> Option<Timecode> {
        self.fragments
            .iter()
            .try_fold(Timecode::ZERO, |total, f| total.checked_add(f.duration()))
    }

    /// The half-open range `[start, start + length)` of this timeline.
    ///
    /// The range may span several fragments; each piece keeps its parent's
    /// source and direction.
    ///
    /// # Errors
    /// * `OutOfDuration` - If `start + length` is past the end
    pub fn slice(&self, start: impl Into<Timecode>, length: impl Into<Timecode>) -> Result<Self> {
        let start = start.into();
        let length = length.into();
        self.check_range(start, length)?;

        let mut result = Timeline::new();
        if length.is_zero() {
            return Ok(result);
        }

        let mut skip = start;
        let mut remain = length;

        for fragment in &self.fragments {
            if skip >= fragment.duration() {
                skip = skip - fragment.duration();
                continue;
            }

            let available = fragment.duration() - skip;
            if remain <= available {
                result.fragments.push(fragment.sub_range(skip, remain));
                break;
            }

            result.fragments.push(fragment.sub_range(skip, available));
            remain = remain - available;
            skip = Timecode::ZERO;
        }

        Ok(result)
    }

    /// Append `other`'s fragments to this timeline in place.
    ///
    /// Mutates the receiver. Use `&a + &b` for a fresh timeline.
    pub fn concat(&mut self, other: &Timeline) -> &mut Self {
        self.fragments.extend(other.fragments.iter().cloned());
        self
    }

    /// Repeat this timeline's current fragments so it plays `count` times.
    ///
    /// Mutates the receiver. `count == 1` leaves it unchanged.
    ///
    /// # Errors
    /// * `InvalidArgument` - If `count` is zero
    pub fn loop_in_place(&mut self, count: usize) -> Result<&mut Self> {
        if count == 0 {
            return Err(TapecutError::invalid_argument("loop count must be at least 1"));
        }

        let original = self.fragments.clone();
        self.fragments.reserve(original.len() * (count - 1));
        for _ in 1..count {
            self.fragments.extend(original.iter().cloned());
        }

        Ok(self)
    }

    /// Cut the timeline into `count` consecutive pieces of (nearly) equal length.
    ///
    /// Piece boundaries are computed from the total each time, so pieces
    /// differ by at most one tick and always add back up to the full duration.
    ///
    /// # Errors
    /// * `InvalidArgument` - If `count` is zero, or if the total duration
    ///   overflows
    pub fn split(&self, count: usize) -> Result<Vec<Self>> {
        if count == 0 {
            return Err(TapecutError::invalid_argument("split count must be at least 1"));
        }

        let total = self.exact_duration()?;
        let boundary = |i: usize| {
            let micros = total.as_micros() as u128 * i as u128 / count as u128;
            Timecode::from_micros(micros as u64)
        };

        (0..count)
            .map(|i| {
                let from = boundary(i);
                self.slice(from, boundary(i + 1) - from)
            })
            .collect()
    }

    /// Repeat this timeline until it is exactly `target` long, cutting the
    /// last repetition short as needed.
    ///
    /// # Errors
    /// * `EmptyFragment` - If this timeline has no fragments
    pub fn fill(&self, target: impl Into<Timecode>) -> Result<Self> {
        if self.is_empty() {
            return Err(TapecutError::EmptyFragment);
        }
        Ok(self.fill_nonempty(target.into()))
    }

    pub(crate) fn fill_nonempty(&self, target: Timecode) -> Self {
        let total = self.duration();
        let mut result = Timeline::new();
        let mut remain = target;

        while remain >= total {
            result.concat(self);
            remain = remain - total;
        }

        if !remain.is_zero() {
            result.fragments.extend(self.prefix(remain).fragments);
        }

        result
    }

    /// Substitute `[start, start + length)` with `replacement`.
    ///
    /// # Errors
    /// * `OutOfDuration` - If `start + length` is past the end
    /// * `InvalidArgument` - If the total duration overflows
    pub fn replace(
        &self,
        start: impl Into<Timecode>,
        length: impl Into<Timecode>,
        replacement: &Timeline,
    ) -> Result<Self> {
        let start = start.into();
        let length = length.into();
        let offset = self.check_range(start, length)?;
        let total = self.exact_duration()?;

        let mut result = if start.is_zero() {
            Timeline::new()
        } else {
            self.slice(Timecode::ZERO, start)?
        };

        result.concat(replacement);
        result.concat(&self.slice(offset, total - offset)?);

        Ok(result)
    }

    /// Play the timeline backwards: fragment order reversed and every
    /// fragment's direction flipped
    pub fn reverse(&self) -> Self {
        self.fragments.iter().rev().map(Fragment::flipped).collect()
    }

    fn exact_duration(&self) -> Result<Timecode> {
        self.checked_duration().ok_or_else(|| {
            TapecutError::invalid_argument(
                "timeline is longer than the largest representable time",
            )
        })
    }

    /// Validated `start + length`
    fn check_range(&self, start: Timecode, length: Timecode) -> Result<Timecode> {
        let available = self.duration();
        match start.checked_add(length) {
            Some(end) if end <= available => Ok(end),
            end => Err(TapecutError::OutOfDuration {
                requested: end.unwrap_or(Timecode::from_micros(u64::MAX)),
                available,
            }),
        }
    }

    /// `slice(0, length)` for a length already known to be in range
    fn prefix(&self, length: Timecode) -> Self {
        self.slice(Timecode::ZERO, length).unwrap_or_default()
    }
}

impl FromIterator<Fragment> for Timeline {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        Self::from_fragments(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Fragment;
    type IntoIter = std::slice::Iter<'a, Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.iter()
    }
}

impl IntoIterator for Timeline {
    type Item = Fragment;
    type IntoIter = std::vec::IntoIter<Fragment>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.into_iter()
    }
}

/// Pure concatenation: neither operand is modified
impl Add<&Timeline> for &Timeline {
    type Output = Timeline;

    fn add(self, other: &Timeline) -> Timeline {
        self.fragments
            .iter()
            .chain(other.fragments.iter())
            .cloned()
            .collect()
    }
}

impl Add<&Timeline> for Timeline {
    type Output = Timeline;

    fn add(mut self, other: &Timeline) -> Timeline {
        self.concat(other);
        self
    }
}

impl Add for Timeline {
    type Output = Timeline;

    fn add(mut self, other: Timeline) -> Timeline {
        self.fragments.extend(other.fragments);
        self
    }
}

/// In-place concatenation, same as [`Timeline::concat`]
impl AddAssign<&Timeline> for Timeline {
    fn add_assign(&mut self, other: &Timeline) {
        self.concat(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Source;
    use pretty_assertions::assert_eq;

    fn secs(s: f64) -> Timecode {
        Timecode::from_secs_f64(s)
    }

    fn frag(name: &str, start: f64, duration: f64) -> Fragment {
        Fragment::new(name, start, duration, false).unwrap()
    }

    /// a.wav [0, 3) + b.wav [1, 3) + c.wav [0, 5), 10 seconds total
    fn three_part() -> Timeline {
        Timeline::from_fragments(vec![
            frag("a.wav", 0.0, 3.0),
            frag("b.wav", 1.0, 2.0),
            frag("c.wav", 0.0, 5.0),
        ])
    }

    #[test]
    fn test_duration_is_sum() {
        assert_eq!(three_part().duration(), secs(10.0));
        assert_eq!(Timeline::new().duration(), Timecode::ZERO);
    }

    #[test]
    fn test_slice_inside_one_fragment() {
        let sliced = three_part().slice(0.5, 2.0).unwrap();
        assert_eq!(sliced.fragments(), &[frag("a.wav", 0.5, 2.0)]);
    }

    #[test]
    fn test_slice_spanning_fragments() {
        let sliced = three_part().slice(2.0, 5.0).unwrap();

        assert_eq!(
            sliced.fragments(),
            &[
                frag("a.wav", 2.0, 1.0),
                frag("b.wav", 1.0, 2.0),
                frag("c.wav", 0.0, 2.0),
            ]
        );
        assert_eq!(sliced.duration(), secs(5.0));
    }

    #[test]
    fn test_slice_starting_on_fragment_boundary() {
        let sliced = three_part().slice(3.0, 2.0).unwrap();
        assert_eq!(sliced.fragments(), &[frag("b.wav", 1.0, 2.0)]);
    }

    #[test]
    fn test_slice_keeps_reversed_flag() {
        let t = Timeline::from_fragments(vec![Fragment::new("a.wav", 0.0, 4.0, true).unwrap()]);
        let sliced = t.slice(1.0, 1.0).unwrap();
        assert!(sliced.fragments()[0].is_reversed());
    }

    #[test]
    fn test_slice_whole_timeline_is_identity() {
        let t = three_part();
        assert_eq!(t.slice(Timecode::ZERO, t.duration()).unwrap(), t);
    }

    #[test]
    fn test_slice_zero_length_is_empty() {
        let sliced = three_part().slice(4.0, 0.0).unwrap();
        assert!(sliced.is_empty());
    }

    #[test]
    fn test_slice_past_end() {
        let t = three_part();
        let err = t
            .slice(Timecode::ZERO, t.duration() + Timecode::from_micros(1))
            .unwrap_err();
        assert!(matches!(
            err,
            TapecutError::OutOfDuration { available, .. } if available == secs(10.0)
        ));
    }

    #[test]
    fn test_slice_overflowing_range() {
        let err = three_part()
            .slice(Timecode::from_micros(u64::MAX), secs(1.0))
            .unwrap_err();
        assert!(matches!(err, TapecutError::OutOfDuration { .. }));
    }

    #[test]
    fn test_slice_never_emits_empty_fragments() {
        let t = three_part();
        for start_ms in (0..10_000).step_by(250) {
            for len_ms in (250..=(10_000 - start_ms)).step_by(750) {
                let sliced = t
                    .slice(
                        Timecode::from_micros(start_ms * 1000),
                        Timecode::from_micros(len_ms * 1000),
                    )
                    .unwrap();
                assert!(sliced.iter().all(|f| !f.duration().is_zero()));
                assert_eq!(sliced.duration(), Timecode::from_micros(len_ms * 1000));
            }
        }
    }

    #[test]
    fn test_concat_mutates_receiver() {
        let mut t = three_part();
        let other = Timeline::from_fragments(vec![frag("d.wav", 0.0, 1.0)]);

        t.concat(&other).concat(&other);

        assert_eq!(t.len(), 5);
        assert_eq!(t.duration(), secs(12.0));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_add_is_pure() {
        let a = three_part();
        let b = Timeline::from_fragments(vec![frag("d.wav", 0.0, 1.0)]);

        let c = &a + &b;

        assert_eq!(a, three_part());
        assert_eq!(b.len(), 1);
        assert_eq!(c.len(), 4);
        assert_eq!(c.fragments()[3], frag("d.wav", 0.0, 1.0));
    }

    #[test]
    fn test_add_assign_appends() {
        let mut a = Timeline::new();
        a += &three_part();
        a += &three_part();
        assert_eq!(a.duration(), secs(20.0));
    }

    #[test]
    fn test_loop_in_place() {
        let mut t = three_part();
        t.loop_in_place(3).unwrap();

        assert_eq!(t.len(), 9);
        assert_eq!(t.duration(), secs(30.0));
        assert_eq!(t.fragments()[3], t.fragments()[0]);
        assert_eq!(t.fragments()[8], frag("c.wav", 0.0, 5.0));
    }

    #[test]
    fn test_loop_once_is_noop() {
        let mut t = three_part();
        t.loop_in_place(1).unwrap();
        assert_eq!(t, three_part());
    }

    #[test]
    fn test_loop_zero_is_rejected() {
        let mut t = three_part();
        assert!(t.loop_in_place(0).is_err());
        assert_eq!(t, three_part());
    }

    #[test]
    fn test_split_even() {
        let pieces = three_part().split(4).unwrap();

        assert_eq!(pieces.len(), 4);
        for piece in &pieces {
            assert_eq!(piece.duration(), secs(2.5));
        }
        assert_eq!(pieces[1].fragments(), &[frag("a.wav", 2.5, 0.5), frag("b.wav", 1.0, 2.0)]);
    }

    #[test]
    fn test_split_uneven_within_one_tick() {
        let t = three_part();
        let pieces = t.split(3).unwrap();

        let expected = t.duration().as_secs_f64() / 3.0;
        for piece in &pieces {
            approx::assert_abs_diff_eq!(piece.duration().as_secs_f64(), expected, epsilon = 1e-6);
        }

        let rejoined = pieces.iter().fold(Timeline::new(), |acc, p| acc + p);
        assert_eq!(rejoined.duration(), t.duration());
    }

    #[test]
    fn test_split_zero_is_rejected() {
        assert!(three_part().split(0).is_err());
    }

    #[test]
    fn test_fill_longer_than_source() {
        let t = three_part();
        let filled = t.fill(25.0).unwrap();

        assert_eq!(filled.duration(), secs(25.0));
        // two whole copies, then a.wav + b.wav for the last 5 seconds
        assert_eq!(filled.len(), 8);
        assert_eq!(filled.fragments()[7], frag("b.wav", 1.0, 2.0));
    }

    #[test]
    fn test_fill_shorter_than_source() {
        let filled = three_part().fill(4.0).unwrap();
        assert_eq!(filled.fragments(), &[frag("a.wav", 0.0, 3.0), frag("b.wav", 1.0, 1.0)]);
    }

    #[test]
    fn test_fill_exact_multiple() {
        let filled = three_part().fill(20.0).unwrap();
        assert_eq!(filled.len(), 6);
        assert_eq!(filled.duration(), secs(20.0));
    }

    #[test]
    fn test_fill_empty_timeline() {
        let err = Timeline::new().fill(3.0).unwrap_err();
        assert!(matches!(err, TapecutError::EmptyFragment));
    }

    #[test]
    fn test_replace_middle() {
        let t = three_part();
        let replacement = Timeline::from_fragments(vec![frag("x.wav", 0.0, 0.5)]);

        let replaced = t.replace(2.0, 2.0, &replacement).unwrap();

        assert_eq!(
            replaced.fragments(),
            &[
                frag("a.wav", 0.0, 2.0),
                frag("x.wav", 0.0, 0.5),
                frag("b.wav", 2.0, 1.0),
                frag("c.wav", 0.0, 5.0),
            ]
        );
        assert_eq!(replaced.duration(), secs(10.0 - 2.0 + 0.5));
    }

    #[test]
    fn test_replace_at_start() {
        let replacement = Timeline::from_fragments(vec![frag("x.wav", 0.0, 1.0)]);
        let replaced = three_part().replace(0.0, 3.0, &replacement).unwrap();

        assert_eq!(replaced.fragments()[0], frag("x.wav", 0.0, 1.0));
        assert_eq!(replaced.duration(), secs(8.0));
    }

    #[test]
    fn test_replace_at_end() {
        let replacement = Timeline::from_fragments(vec![frag("x.wav", 0.0, 1.0)]);
        let replaced = three_part().replace(5.0, 5.0, &replacement).unwrap();

        assert_eq!(replaced.fragments().last(), Some(&frag("x.wav", 0.0, 1.0)));
        assert_eq!(replaced.duration(), secs(6.0));
    }

    #[test]
    fn test_replace_out_of_range() {
        let err = three_part()
            .replace(9.0, 2.0, &Timeline::new())
            .unwrap_err();
        assert!(matches!(err, TapecutError::OutOfDuration { .. }));
    }

    #[test]
    fn test_reverse() {
        let reversed = three_part().reverse();

        assert_eq!(reversed.len(), 3);
        assert_eq!(reversed.fragments()[0].source(), &Source::from("c.wav"));
        assert!(reversed.iter().all(Fragment::is_reversed));
        assert_eq!(reversed.duration(), secs(10.0));
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let t = three_part();
        assert_eq!(t.reverse().reverse(), t);
    }

    #[test]
    fn test_json_keeps_fragments() {
        let t = three_part().reverse();
        let json = serde_json::to_string(&t).unwrap();
        let back: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    fn half_max() -> Timeline {
        let half = Timecode::from_micros(u64::MAX / 2 + 1);
        Timeline::from_fragments(vec![
            Fragment::new("a.wav", Timecode::ZERO, half, false).unwrap(),
            Fragment::new("b.wav", Timecode::ZERO, half, false).unwrap(),
        ])
    }

    #[test]
    fn test_huge_timeline_duration_saturates() {
        let t = half_max();
        assert_eq!(t.duration(), Timecode::MAX);
        assert_eq!(t.checked_duration(), None);
        assert_eq!(three_part().checked_duration(), Some(secs(10.0)));
    }

    #[test]
    fn test_huge_timeline_slice_stays_exact() {
        let t = half_max();
        let sliced = t.slice(secs(0.5), secs(0.5)).unwrap();
        assert_eq!(sliced.duration(), secs(0.5));
        assert_eq!(sliced.fragments()[0].start(), secs(0.5));
    }

    #[test]
    fn test_huge_timeline_split_and_replace_are_rejected() {
        let t = half_max();
        let err = t.split(2).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        let err = t.replace(Timecode::ZERO, secs(1.0), &three_part()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }
}
