//! Turn segmentation over synthetic frame streams.

use std::time::Duration;

use tokio::sync::mpsc;

use hr_voice_assistant::audio::segmenter::{
    SegmenterConfig, SegmenterControl, SegmenterMode, VoiceActivitySegmenter,
};
use hr_voice_assistant::audio::AudioFrame;

const SAMPLE_RATE: u32 = 16_000;
const FRAME_MS: u64 = 100;
const SAMPLES_PER_FRAME: usize = (SAMPLE_RATE as usize * FRAME_MS as usize) / 1000;

fn config(mode: SegmenterMode) -> SegmenterConfig {
    SegmenterConfig {
        energy_threshold: 0.012,
        silence: Duration::from_millis(1200),
        frame_duration: Duration::from_millis(FRAME_MS),
        pre_speech: Duration::from_millis(400),
        min_speech: Duration::from_millis(300),
        mode,
    }
}

fn loud_frame(timestamp_ms: u64) -> AudioFrame {
    // square wave at ~30% full scale, far above the threshold
    let samples: Vec<i16> = (0..SAMPLES_PER_FRAME)
        .map(|i| if i % 2 == 0 { 10_000 } else { -10_000 })
        .collect();
    AudioFrame {
        samples,
        sample_rate: SAMPLE_RATE,
        timestamp_ms,
    }
}

fn silent_frame(timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![0; SAMPLES_PER_FRAME],
        sample_rate: SAMPLE_RATE,
        timestamp_ms,
    }
}

/// 2s of speech followed by 1.5s of silence yields exactly one utterance.
#[tokio::test]
async fn speech_then_silence_yields_one_utterance() {
    let (tx, rx) = mpsc::channel(256);
    let control = SegmenterControl::new();
    let mut segmenter = VoiceActivitySegmenter::new(config(SegmenterMode::Auto), control, rx);

    let mut ts = 0u64;
    for _ in 0..20 {
        tx.send(loud_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    for _ in 0..15 {
        tx.send(silent_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    drop(tx);

    let utterance = segmenter
        .next_utterance()
        .await
        .unwrap()
        .expect("one utterance");
    assert!(!utterance.likely_noise);
    // 20 speech frames plus trailing silence up to the cutoff
    assert!(utterance.samples.len() >= 20 * SAMPLES_PER_FRAME);

    // stream is exhausted afterwards
    assert!(segmenter.next_utterance().await.unwrap().is_none());
}

/// The pre-speech roll buffer is prepended, so the utterance starts before
/// the onset frame.
#[tokio::test]
async fn pre_speech_audio_is_prepended() {
    let (tx, rx) = mpsc::channel(256);
    let control = SegmenterControl::new();
    let mut segmenter = VoiceActivitySegmenter::new(config(SegmenterMode::Auto), control, rx);

    let mut ts = 0u64;
    for _ in 0..10 {
        tx.send(silent_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    let onset_ts = ts;
    for _ in 0..10 {
        tx.send(loud_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    for _ in 0..13 {
        tx.send(silent_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    drop(tx);

    let utterance = segmenter
        .next_utterance()
        .await
        .unwrap()
        .expect("one utterance");
    // 400ms pre-roll = 4 frames before onset
    assert_eq!(utterance.started_at_ms, onset_ts - 400);
}

/// A burst shorter than the minimum speech duration is flagged, not dropped.
#[tokio::test]
async fn short_burst_is_flagged_as_noise() {
    let (tx, rx) = mpsc::channel(256);
    let control = SegmenterControl::new();
    let mut segmenter = VoiceActivitySegmenter::new(config(SegmenterMode::Auto), control, rx);

    let mut ts = 0u64;
    for _ in 0..2 {
        tx.send(loud_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    for _ in 0..13 {
        tx.send(silent_frame(ts)).await.unwrap();
        ts += FRAME_MS;
    }
    drop(tx);

    let utterance = segmenter
        .next_utterance()
        .await
        .unwrap()
        .expect("one utterance");
    assert!(utterance.likely_noise);
}

/// Silence-only streams never produce an utterance.
#[tokio::test]
async fn silence_only_stream_yields_none() {
    let (tx, rx) = mpsc::channel(256);
    let control = SegmenterControl::new();
    let mut segmenter = VoiceActivitySegmenter::new(config(SegmenterMode::Auto), control, rx);

    for i in 0..30 {
        tx.send(silent_frame(i * FRAME_MS)).await.unwrap();
    }
    drop(tx);

    assert!(segmenter.next_utterance().await.unwrap().is_none());
}

/// The stop flag is observed even when no frames are arriving.
#[tokio::test]
async fn stop_is_observed_without_audio() {
    let (tx, rx) = mpsc::channel::<AudioFrame>(4);
    let control = SegmenterControl::new();
    let mut segmenter = VoiceActivitySegmenter::new(config(SegmenterMode::Auto), control.clone(), rx);

    control.request_stop();
    assert!(segmenter.next_utterance().await.unwrap().is_none());
    drop(tx);
}

/// A stream that ends mid-capture flushes the partial audio as a final turn.
#[tokio::test]
async fn stream_end_mid_capture_flushes_partial_utterance() {
    let (tx, rx) = mpsc::channel(256);
    let control = SegmenterControl::new();
    let mut segmenter = VoiceActivitySegmenter::new(config(SegmenterMode::Auto), control, rx);

    for i in 0..8 {
        tx.send(loud_frame(i * FRAME_MS)).await.unwrap();
    }
    drop(tx); // no closing silence

    let utterance = segmenter
        .next_utterance()
        .await
        .unwrap()
        .expect("flushed utterance");
    assert_eq!(utterance.samples.len(), 8 * SAMPLES_PER_FRAME);
}

/// Manual mode records everything until the end-turn signal.
#[tokio::test]
async fn manual_mode_closes_on_end_turn_signal() {
    let (tx, rx) = mpsc::channel(256);
    let control = SegmenterControl::new();
    let mut segmenter =
        VoiceActivitySegmenter::new(config(SegmenterMode::Manual), control.clone(), rx);

    for i in 0..5 {
        tx.send(silent_frame(i * FRAME_MS)).await.unwrap();
    }
    // quiet frames still count in manual mode
    let handle = tokio::spawn(async move { segmenter.next_utterance().await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    control.signal_end_turn();

    let utterance = handle.await.unwrap().unwrap().expect("manual utterance");
    assert_eq!(utterance.samples.len(), 5 * SAMPLES_PER_FRAME);
    drop(tx);
}
