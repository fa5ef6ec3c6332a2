use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{AssistantError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub segmenter: SegmenterSettings,
    pub language: LanguageConfig,
    pub matching: MatchingConfig,
    pub retrieval: RetrievalConfig,
    pub providers: ProvidersConfig,
    pub retry: RetrySettings,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture/processing sample rate in Hz
    pub sample_rate: u32,
    /// Frame duration in milliseconds (cancellation is polled per frame)
    pub frame_duration_ms: u64,
}

/// Turn-segmentation tuning. Units are seconds and normalized RMS amplitude.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmenterSettings {
    /// Normalized RMS amplitude above which a frame counts as speech
    pub energy_threshold: f32,
    /// Continuous below-threshold time that closes an utterance
    pub silence_seconds: f32,
    /// Audio kept from before detected speech onset
    pub pre_speech_seconds: f32,
    /// Captures shorter than this are flagged as likely noise
    pub min_speech_seconds: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageConfig {
    /// ISO 639-3 code passed to the STT provider (e.g. "hye")
    pub code: String,
    /// Minimum ratio of Armenian letters for a transcript to count
    pub min_letter_ratio: f32,
    /// Minimum number of Armenian letters for a transcript to count
    pub min_letters: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Similarity acceptance bar for a FAQ match (0.0 to 1.0)
    pub faq_confidence_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of knowledge chunks fed to generation
    pub top_k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttProvider {
    ElevenLabs,
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    ElevenLabs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// STT provider, selected once per session
    pub stt: SttProvider,
    pub stt_model: String,
    pub tts: TtsProvider,
    pub tts_model: String,
    pub tts_voice_id: String,
    pub completion_model: String,
    /// Upper bound for any single service round-trip, in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per service call (1 = no retry)
    pub max_attempts: u32,
    /// Linear backoff between attempts, in milliseconds
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Parent directory for numbered conversation directories
    pub conversations_dir: PathBuf,
    /// FAQ corpus JSON path
    pub faq_json: PathBuf,
    /// Knowledge corpus JSON path
    pub knowledge_json: PathBuf,
    /// Prebuilt FAQ voice directory (holds index.json and audio files)
    pub voice_answers_dir: PathBuf,
    /// Keep the per-turn scratch history file after finalize
    pub keep_scratch: bool,
    /// Rolling history window fed to generation, in turns
    pub history_turns: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| AssistantError::Config(format!("cannot read config {path}: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| AssistantError::Config(format!("invalid config {path}: {e}")))
    }
}

/// Provider API keys, read from the environment (a `.env` file is honored
/// when present). Only the keys the selected providers need are required.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub elevenlabs_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            elevenlabs_api_key: std::env::var("ELEVENLABS_API_KEY")
                .or_else(|_| std::env::var("XI_API_KEY"))
                .ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
        }
    }

    pub fn require_elevenlabs(&self) -> Result<String> {
        self.elevenlabs_api_key.clone().ok_or_else(|| {
            AssistantError::Config(
                "missing ELEVENLABS_API_KEY (or XI_API_KEY) in environment or .env".into(),
            )
        })
    }

    pub fn require_gemini(&self) -> Result<String> {
        self.gemini_api_key.clone().ok_or_else(|| {
            AssistantError::Config("missing GEMINI_API_KEY in environment or .env".into())
        })
    }
}
