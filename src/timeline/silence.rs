//! Built-in silence
//!
//! Any length of silence is made by repeating one short silent clip. The
//! clip has no file of its own until a render writes it into scratch space.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::fragment::{Fragment, Source};
use super::ops::Timeline;
use crate::error::{Result, TapecutError};
use crate::time::Timecode;

/// Length of the built-in silent clip
pub const SILENCE_CLIP_LENGTH: Timecode = Timecode::from_secs(1);

/// Sample rate of the built-in silent clip
pub const SILENCE_SAMPLE_RATE: u32 = 44100;

const SILENCE_CHANNELS: u16 = 2;

impl Timeline {
    /// A timeline of silence exactly `duration` long
    pub fn silence(duration: impl Into<Timecode>) -> Self {
        let unit = Timeline::from_fragments(vec![Fragment::from_parts(
            Source::Silence,
            Timecode::ZERO,
            SILENCE_CLIP_LENGTH,
            false,
        )]);
        unit.fill_nonempty(duration.into())
    }
}

/// Write the built-in silent clip as a WAV file at `path`
pub fn write_silence_clip(path: &Path) -> Result<()> {
    let spec = WavSpec {
        channels: SILENCE_CHANNELS,
        sample_rate: SILENCE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let to_io = |e: hound::Error| match e {
        hound::Error::IoError(io) => TapecutError::Io(io),
        other => TapecutError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    };

    let mut writer = WavWriter::create(path, spec).map_err(to_io)?;
    let frames = SILENCE_SAMPLE_RATE as u64 * SILENCE_CLIP_LENGTH.as_micros()
        / crate::time::TICKS_PER_SECOND;
    for _ in 0..frames * SILENCE_CHANNELS as u64 {
        writer.write_sample(0i16).map_err(to_io)?;
    }
    writer.finalize().map_err(to_io)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{FileProbe, SourceProbe};
    use tempfile::tempdir;

    #[test]
    fn test_silence_exact_duration() {
        let silence = Timeline::silence(2.75);

        assert_eq!(silence.duration(), Timecode::from_micros(2_750_000));
        assert_eq!(silence.len(), 3);
        assert!(silence.iter().all(|f| f.source().is_silence()));
        assert_eq!(silence.fragments()[2].duration(), Timecode::from_micros(750_000));
    }

    #[test]
    fn test_silence_shorter_than_clip() {
        let silence = Timeline::silence(0.25);
        assert_eq!(silence.len(), 1);
        assert_eq!(silence.duration(), Timecode::from_micros(250_000));
    }

    #[test]
    fn test_zero_silence_is_empty() {
        assert!(Timeline::silence(0.0).is_empty());
    }

    #[test]
    fn test_written_clip_matches_declared_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("silence.wav");

        write_silence_clip(&path).unwrap();

        assert_eq!(FileProbe.probe(&path).unwrap(), SILENCE_CLIP_LENGTH);
        let reader = hound::WavReader::open(&path).unwrap();
        assert!(reader.into_samples::<i16>().all(|s| s.unwrap() == 0));
    }
}
