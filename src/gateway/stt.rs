//! Speech-to-text gateways.
//!
//! Two interchangeable providers sit behind [`TranscriptionGateway`]: the
//! ElevenLabs speech-to-text endpoint (multipart WAV upload) and Gemini
//! audio understanding (inline base64 WAV). Both run the transcript through
//! the Armenian language gate before handing it to the caller.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::audio::file::wav_bytes;
use crate::audio::segmenter::Utterance;
use crate::config::LanguageConfig;
use crate::error::{AssistantError, Result, ServiceKind};
use crate::gateway::completion::extract_gemini_text;
use crate::text::is_mostly_armenian;

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Transcription result. `empty` marks transcripts the caller should skip
/// without recording a turn: nothing was said, or the language gate failed.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language: String,
    pub empty: bool,
}

impl Transcript {
    fn empty(language: &str) -> Self {
        Self {
            text: String::new(),
            language: language.to_string(),
            empty: true,
        }
    }
}

#[async_trait]
pub trait TranscriptionGateway: Send + Sync {
    async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript>;

    fn name(&self) -> &str;
}

/// Rejects transcripts that are not predominantly Armenian. Provider
/// language hints are advisory; this is the enforced check.
#[derive(Debug, Clone)]
pub struct LanguageGate {
    code: String,
    min_letter_ratio: f32,
    min_letters: usize,
}

impl LanguageGate {
    pub fn from_config(config: &LanguageConfig) -> Self {
        Self {
            code: config.code.clone(),
            min_letter_ratio: config.min_letter_ratio,
            min_letters: config.min_letters,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn apply(&self, raw_text: &str) -> Transcript {
        let text = raw_text.trim();
        if text.is_empty() {
            return Transcript::empty(&self.code);
        }
        if !is_mostly_armenian(text, self.min_letter_ratio, self.min_letters) {
            debug!(text, "transcript rejected by language gate");
            return Transcript::empty(&self.code);
        }
        Transcript {
            text: text.to_string(),
            language: self.code.clone(),
            empty: false,
        }
    }
}

/// ElevenLabs speech-to-text over multipart upload.
pub struct ElevenLabsStt {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    gate: LanguageGate,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsSttResponse {
    text: String,
}

impl ElevenLabsStt {
    pub fn new(client: reqwest::Client, api_key: String, model_id: String, gate: LanguageGate) -> Self {
        Self {
            client,
            api_key,
            model_id,
            gate,
            base_url: ELEVENLABS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TranscriptionGateway for ElevenLabsStt {
    async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript> {
        let wav = wav_bytes(&utterance.samples, utterance.sample_rate)?;
        let file = reqwest::multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| AssistantError::service(ServiceKind::Transcription, e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model_id", self.model_id.clone())
            .text("language_code", self.gate.code().to_string())
            .part("file", file);

        let response = self
            .client
            .post(format!("{}/v1/speech-to-text", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Transcription, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::service(
                ServiceKind::Transcription,
                format!("elevenlabs returned {status}: {body}"),
            ));
        }

        let parsed: ElevenLabsSttResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Transcription, e.to_string()))?;

        Ok(self.gate.apply(&parsed.text))
    }

    fn name(&self) -> &str {
        "elevenlabs-stt"
    }
}

/// Gemini audio transcription via `generateContent` with inline WAV data.
pub struct GeminiStt {
    client: reqwest::Client,
    api_key: String,
    model: String,
    gate: LanguageGate,
    base_url: String,
}

impl GeminiStt {
    pub fn new(client: reqwest::Client, api_key: String, model: String, gate: LanguageGate) -> Self {
        Self {
            client,
            api_key,
            model,
            gate,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TranscriptionGateway for GeminiStt {
    async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript> {
        let wav = wav_bytes(&utterance.samples, utterance.sample_rate)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(wav);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": "Transcribe this Armenian speech recording. Return only the transcribed text, nothing else."},
                    {"inline_data": {"mime_type": "audio/wav", "data": encoded}}
                ]
            }]
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Transcription, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::service(
                ServiceKind::Transcription,
                format!("gemini returned {status}: {body}"),
            ));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Transcription, e.to_string()))?;

        match extract_gemini_text(&value) {
            Some(text) => Ok(self.gate.apply(&text)),
            None => Ok(Transcript::empty(self.gate.code())),
        }
    }

    fn name(&self) -> &str {
        "gemini-stt"
    }
}
