//! External service gateways: transcription, answer generation, synthesis.

pub mod completion;
pub mod retry;
pub mod stt;
pub mod tts;

use std::time::Duration;

use crate::error::{AssistantError, Result};

pub use completion::{CompletionGateway, GeminiCompletion};
pub use retry::{with_retries, RetryPolicy};
pub use stt::{ElevenLabsStt, GeminiStt, LanguageGate, Transcript, TranscriptionGateway};
pub use tts::{play_best_effort, ElevenLabsTts, SynthesisGateway, VoiceCache};

/// Shared HTTP client for all provider gateways, with a per-request
/// timeout so a hung service degrades a turn instead of freezing the loop.
pub fn http_client(request_timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()
        .map_err(|e| AssistantError::Config(format!("cannot build HTTP client: {e}")))
}
