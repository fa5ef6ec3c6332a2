//! Session and turn records persisted in the conversation manifest.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the answer text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Faq,
    Generated,
}

/// Where the spoken audio came from (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSource {
    /// Prebuilt recording served from the voice-answer cache
    FaqPrebuilt,
    /// Freshly synthesized generated answer
    TtsGenerated,
    /// Freshly synthesized FAQ answer (cache miss or stale)
    TtsGeneratedFromFaq,
    /// Synthesis failed; the turn carries text only
    TextOnly,
}

/// One completed exchange: what the user said, what was answered, and the
/// artifacts written for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub index: u32,
    pub user_text: String,
    pub assistant_text: String,
    pub answer_source: AnswerSource,
    pub voice_source: VoiceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faq_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,
    pub fallback: bool,
    pub input_audio_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_path: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Live session state. Accumulates turns until finalize writes the manifest.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub turns: Vec<Turn>,
    /// Session directory root (`conversation-NNN`)
    pub root: PathBuf,
}

impl Session {
    /// 1-based index for the next turn.
    pub fn next_turn_index(&self) -> u32 {
        self.turns.len() as u32 + 1
    }
}

/// The `conversation.json` manifest written at finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManifest {
    pub conversation_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub turn_count: usize,
    pub turns: Vec<Turn>,
}
