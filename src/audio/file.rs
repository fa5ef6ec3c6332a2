use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use crate::error::{AssistantError, Result};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .map_err(|e| AssistantError::Capture(format!("cannot open {}: {e}", path.display())))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AssistantError::Capture(format!("cannot read {}: {e}", path.display())))?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            path = %path.display(),
            duration_secs = format_args!("{duration_seconds:.1}"),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "audio file loaded"
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write mono i16 samples to a WAV file.
pub fn write_wav(path: impl AsRef<Path>, samples: &[i16], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, mono_spec(sample_rate))
        .map_err(|e| wav_storage_error(path, e))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| wav_storage_error(path, e))?;
    }
    writer.finalize().map_err(|e| wav_storage_error(path, e))?;
    Ok(())
}

/// Encode mono i16 samples as in-memory WAV bytes (for STT uploads).
pub fn wav_bytes(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, mono_spec(sample_rate))
            .map_err(|e| AssistantError::Capture(format!("wav encode failed: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| AssistantError::Capture(format!("wav encode failed: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| AssistantError::Capture(format!("wav encode failed: {e}")))?;
    }
    Ok(cursor.into_inner())
}

fn wav_storage_error(path: &Path, e: hound::Error) -> AssistantError {
    match e {
        hound::Error::IoError(io) => AssistantError::storage(path, io),
        other => AssistantError::storage(
            path,
            std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        ),
    }
}
