//! Voice-activity turn segmentation.
//!
//! Scans a live frame stream and emits one Utterance per detected burst of
//! speech. Speech starts when frame RMS energy crosses `energy_threshold`
//! and ends after `silence_seconds` of continuous below-threshold audio.
//! A short pre-speech roll buffer is prepended so word onsets are not
//! clipped. The stop flag is polled once per frame interval, so cancellation
//! takes effect within one frame even when no audio is arriving.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::audio::backend::AudioFrame;
use crate::config::SegmenterSettings;
use crate::error::Result;

/// Segmentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterMode {
    /// Threshold-driven: speech onset opens a turn, sustained silence closes it.
    Auto,
    /// Recording starts immediately; an explicit end-turn signal closes it.
    Manual,
}

/// Shared control handle: stop flag plus the manual-mode end-turn signal.
#[derive(Debug, Clone, Default)]
pub struct SegmenterControl {
    stop: Arc<AtomicBool>,
    end_turn: Arc<AtomicBool>,
}

impl SegmenterControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request session stop. Observed within one frame interval.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Close the current turn (manual mode).
    pub fn signal_end_turn(&self) {
        self.end_turn.store(true, Ordering::SeqCst);
    }

    fn take_end_turn(&self) -> bool {
        self.end_turn.swap(false, Ordering::SeqCst)
    }
}

/// Tuning for the segmenter. Durations are wall-clock; the threshold is
/// normalized RMS amplitude (full-scale i16 maps to 1.0).
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub energy_threshold: f32,
    pub silence: Duration,
    pub frame_duration: Duration,
    pub pre_speech: Duration,
    pub min_speech: Duration,
    pub mode: SegmenterMode,
}

impl SegmenterConfig {
    pub fn from_settings(
        settings: &SegmenterSettings,
        frame_duration_ms: u64,
        mode: SegmenterMode,
    ) -> Self {
        Self {
            energy_threshold: settings.energy_threshold,
            silence: Duration::from_secs_f32(settings.silence_seconds),
            frame_duration: Duration::from_millis(frame_duration_ms),
            pre_speech: Duration::from_secs_f32(settings.pre_speech_seconds),
            min_speech: Duration::from_secs_f32(settings.min_speech_seconds),
            mode,
        }
    }

    fn frames_for(&self, duration: Duration) -> usize {
        let frame_ms = self.frame_duration.as_millis().max(1);
        ((duration.as_millis() + frame_ms - 1) / frame_ms).max(1) as usize
    }
}

/// One contiguous burst of detected speech, bounded by silence.
/// Consumed exactly once by the transcription stage.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Capture timestamp of the first included frame
    pub started_at_ms: u64,
    /// Fewer speech frames than the configured minimum (coughs, clicks).
    /// Still emitted; filtering is the transcription stage's job.
    pub likely_noise: bool,
}

impl Utterance {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Turn segmenter over a live audio frame stream.
pub struct VoiceActivitySegmenter {
    config: SegmenterConfig,
    control: SegmenterControl,
    frames: mpsc::Receiver<AudioFrame>,
}

fn frame_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let x = s as f64 / i16::MAX as f64;
            x * x
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

impl VoiceActivitySegmenter {
    pub fn new(
        config: SegmenterConfig,
        control: SegmenterControl,
        frames: mpsc::Receiver<AudioFrame>,
    ) -> Self {
        Self {
            config,
            control,
            frames,
        }
    }

    /// Wait for and return the next Utterance.
    ///
    /// Returns `Ok(None)` when the session stop flag is set or the frame
    /// stream ends while no speech is being captured. A stream that ends
    /// mid-capture flushes the accumulated audio as a final Utterance.
    pub async fn next_utterance(&mut self) -> Result<Option<Utterance>> {
        match self.config.mode {
            SegmenterMode::Auto => self.next_auto().await,
            SegmenterMode::Manual => self.next_manual().await,
        }
    }

    async fn next_auto(&mut self) -> Result<Option<Utterance>> {
        let silence_frames_to_stop = self.config.frames_for(self.config.silence);
        let min_speech_frames = self.config.frames_for(self.config.min_speech);
        let pre_buffer_frames = self.config.frames_for(self.config.pre_speech);

        let mut pre_buffer: VecDeque<AudioFrame> = VecDeque::with_capacity(pre_buffer_frames);
        let mut captured: Vec<i16> = Vec::new();
        let mut sample_rate = 0u32;
        let mut started_at_ms = 0u64;
        let mut speech_started = false;
        let mut speech_frames = 0usize;
        let mut silent_frames = 0usize;

        loop {
            if self.control.stop_requested() {
                debug!("stop requested, abandoning partial capture");
                return Ok(None);
            }

            let frame = match timeout(self.config.frame_duration, self.frames.recv()).await {
                Err(_) => continue, // no audio yet; re-check the stop flag
                Ok(None) => {
                    // Stream ended. Flush mid-capture audio as a final turn.
                    if speech_started && !captured.is_empty() {
                        info!(samples = captured.len(), "stream ended mid-capture, flushing");
                        return Ok(Some(Utterance {
                            samples: captured,
                            sample_rate,
                            started_at_ms,
                            likely_noise: speech_frames < min_speech_frames,
                        }));
                    }
                    return Ok(None);
                }
                Ok(Some(frame)) => frame,
            };

            let is_speech = frame_rms(&frame.samples) >= self.config.energy_threshold;

            if !speech_started {
                if is_speech {
                    speech_started = true;
                    speech_frames = 1;
                    silent_frames = 0;
                    let first = pre_buffer.front().unwrap_or(&frame);
                    started_at_ms = first.timestamp_ms;
                    sample_rate = first.sample_rate;
                    for buffered in pre_buffer.drain(..) {
                        captured.extend_from_slice(&buffered.samples);
                    }
                    captured.extend_from_slice(&frame.samples);
                    debug!(started_at_ms, "speech onset");
                } else {
                    if pre_buffer.len() == pre_buffer_frames {
                        pre_buffer.pop_front();
                    }
                    pre_buffer.push_back(frame);
                }
                continue;
            }

            captured.extend_from_slice(&frame.samples);
            if is_speech {
                speech_frames += 1;
                silent_frames = 0;
            } else {
                silent_frames += 1;
                if silent_frames >= silence_frames_to_stop {
                    let likely_noise = speech_frames < min_speech_frames;
                    info!(
                        samples = captured.len(),
                        speech_frames, likely_noise, "utterance closed on silence"
                    );
                    return Ok(Some(Utterance {
                        samples: captured,
                        sample_rate,
                        started_at_ms,
                        likely_noise,
                    }));
                }
            }
        }
    }

    async fn next_manual(&mut self) -> Result<Option<Utterance>> {
        let min_speech_frames = self.config.frames_for(self.config.min_speech);

        let mut captured: Vec<i16> = Vec::new();
        let mut sample_rate = 0u32;
        let mut started_at_ms = 0u64;
        let mut frame_count = 0usize;

        loop {
            if self.control.stop_requested() {
                return Ok(None);
            }

            if self.control.take_end_turn() && !captured.is_empty() {
                return Ok(Some(Utterance {
                    samples: captured,
                    sample_rate,
                    started_at_ms,
                    likely_noise: frame_count < min_speech_frames,
                }));
            }

            let frame = match timeout(self.config.frame_duration, self.frames.recv()).await {
                Err(_) => continue,
                Ok(None) => {
                    if captured.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(Utterance {
                        samples: captured,
                        sample_rate,
                        started_at_ms,
                        likely_noise: frame_count < min_speech_frames,
                    }));
                }
                Ok(Some(frame)) => frame,
            };

            if captured.is_empty() {
                started_at_ms = frame.timestamp_ms;
                sample_rate = frame.sample_rate;
            }
            captured.extend_from_slice(&frame.samples);
            frame_count += 1;
        }
    }
}
