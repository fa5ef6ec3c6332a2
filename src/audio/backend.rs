use tokio::sync::mpsc;
use tracing::info;

use crate::audio::file::AudioFile;
use crate::error::{AssistantError, Result};

/// Audio sample data (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Audio capture backend trait
///
/// Microphone capture is an external collaborator; the engine only depends
/// on this interface. The file backend replays a recorded WAV and is used
/// for tests and offline replay.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio capture source
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Live microphone input (requires a platform backend)
    Microphone,
    /// WAV file replay (testing/offline runs)
    File(String),
}

pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource, frame_duration_ms: u64) -> Result<Box<dyn CaptureBackend>> {
        match source {
            CaptureSource::Microphone => Err(AssistantError::Capture(
                "no platform microphone backend is compiled in; use a WAV input".into(),
            )),
            CaptureSource::File(path) => Ok(Box::new(FileCapture::new(path, frame_duration_ms))),
        }
    }
}

/// Replays a WAV file as a frame stream at the file's own sample rate.
pub struct FileCapture {
    path: String,
    frame_duration_ms: u64,
    capturing: bool,
}

impl FileCapture {
    pub fn new(path: impl Into<String>, frame_duration_ms: u64) -> Self {
        Self {
            path: path.into(),
            frame_duration_ms,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let audio = AudioFile::open(&self.path)?;
        if audio.channels != 1 {
            return Err(AssistantError::Capture(format!(
                "expected mono input, got {} channels in {}",
                audio.channels, self.path
            )));
        }

        let samples_per_frame =
            ((audio.sample_rate as u64 * self.frame_duration_ms) / 1000).max(1) as usize;
        let frame_duration_ms = self.frame_duration_ms;
        let sample_rate = audio.sample_rate;

        info!(
            path = %self.path,
            sample_rate,
            samples_per_frame,
            "starting file capture"
        );

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            for chunk in audio.samples.chunks(samples_per_frame) {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    timestamp_ms,
                };
                timestamp_ms += frame_duration_ms;
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            // Channel closes on drop, signalling end of stream
        });

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
