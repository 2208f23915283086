//! Source duration probing
//!
//! The timeline algebra only needs to know how long a source file plays.
//! WAV headers are read with `hound`; compressed formats go through the
//! `symphonia` probe.

use std::fmt;
use std::fs::File;
use std::path::Path;

use hound::WavReader;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Result, TapecutError};
use crate::time::Timecode;

/// Container formats the probe understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl SourceFormat {
    /// Detect the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") => Ok(SourceFormat::Wav),
            Some("mp3") => Ok(SourceFormat::Mp3),
            Some("flac") => Ok(SourceFormat::Flac),
            Some("ogg") => Ok(SourceFormat::Ogg),
            _ => Err(TapecutError::UnknownFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Whether files of this format can be fed to the mixer without transcoding
    pub fn is_intermediate(self) -> bool {
        self == SourceFormat::Wav
    }

    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Wav => "wav",
            SourceFormat::Mp3 => "mp3",
            SourceFormat::Flac => "flac",
            SourceFormat::Ogg => "ogg",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Returns the playable duration of a source file
pub trait SourceProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<Timecode>;
}

/// Probe backed by the file's own headers
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProbe;

impl SourceProbe for FileProbe {
    fn probe(&self, path: &Path) -> Result<Timecode> {
        match SourceFormat::from_path(path)? {
            SourceFormat::Wav => probe_wav(path),
            format => probe_compressed(path, format),
        }
    }
}

fn probe_wav(path: &Path) -> Result<Timecode> {
    let reader = WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => TapecutError::Io(io),
        other => TapecutError::InvalidAudio {
            path: path.to_path_buf(),
            reason: format!("Failed to open WAV file: {}", other),
        },
    })?;

    let spec = reader.spec();
    Ok(Timecode::from_frames(
        reader.duration() as u64,
        spec.sample_rate,
    ))
}

fn probe_compressed(path: &Path, format: SourceFormat) -> Result<Timecode> {
    let invalid = |reason: String| TapecutError::InvalidAudio {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| invalid(format!("Failed to probe format: {}", e)))?;

    let mut reader = probed.format;

    let (track_id, sample_rate, n_frames) = {
        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| invalid("No audio track found".to_string()))?;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| invalid("Sample rate not found".to_string()))?;
        (track.id, sample_rate, track.codec_params.n_frames)
    };

    if let Some(frames) = n_frames {
        return Ok(Timecode::from_frames(frames, sample_rate));
    }

    // No frame count in the headers: walk the packets and add up their durations.
    let mut frames = 0u64;
    loop {
        match reader.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    frames += packet.dur;
                }
            }
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(invalid(format!("Failed to read packet: {}", e))),
        }
    }

    Ok(Timecode::from_frames(frames, sample_rate))
}
