//! Text-to-speech gateway and the prebuilt voice-answer cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{AssistantError, Result, ServiceKind};

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

#[async_trait]
pub trait SynthesisGateway: Send + Sync {
    /// Render answer text to encoded audio bytes (MP3).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    fn name(&self) -> &str;
}

pub struct ElevenLabsTts {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    voice_id: String,
    language_code: String,
    base_url: String,
}

impl ElevenLabsTts {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        model_id: String,
        voice_id: String,
        language_code: String,
    ) -> Self {
        Self {
            client,
            api_key,
            model_id,
            voice_id,
            language_code,
            base_url: ELEVENLABS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SynthesisGateway for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = json!({
            "text": text,
            "model_id": self.model_id,
            "language_code": self.language_code,
        });

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.base_url, self.voice_id
            ))
            .query(&[("output_format", OUTPUT_FORMAT)])
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Synthesis, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::service(
                ServiceKind::Synthesis,
                format!("elevenlabs returned {status}: {body}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Synthesis, e.to_string()))?;
        if bytes.is_empty() {
            return Err(AssistantError::service(
                ServiceKind::Synthesis,
                "empty audio response",
            ));
        }
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "elevenlabs-tts"
    }
}

#[derive(Debug, Deserialize)]
struct VoiceCacheManifest {
    items: Vec<VoiceCacheItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct VoiceCacheItem {
    id: u32,
    file: String,
    answer: String,
}

/// Prebuilt voice answers for FAQ entries, keyed by FAQ id.
///
/// A cache entry is served only when its recorded answer text still matches
/// the live answer verbatim and the audio file exists, so a stale cache
/// silently falls back to fresh synthesis.
#[derive(Debug, Clone, Default)]
pub struct VoiceCache {
    dir: PathBuf,
    items: HashMap<u32, VoiceCacheItem>,
}

impl VoiceCache {
    /// Load the cache from a directory holding `index.json` plus audio
    /// files. A missing or malformed index yields an empty cache; prebuilt
    /// voice is an optimization, never a requirement.
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let index_path = dir.join("index.json");
        let raw = match std::fs::read_to_string(&index_path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %index_path.display(), error = %e, "no prebuilt voice index");
                return Self {
                    dir,
                    items: HashMap::new(),
                };
            }
        };
        let manifest: VoiceCacheManifest = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(path = %index_path.display(), error = %e, "malformed prebuilt voice index, ignoring");
                return Self {
                    dir,
                    items: HashMap::new(),
                };
            }
        };

        let mut items = HashMap::new();
        for item in manifest.items {
            items.insert(item.id, item);
        }
        Self { dir, items }
    }

    /// Path to the prebuilt audio for a FAQ answer, if the cached answer
    /// text matches `answer_text` verbatim and the file is present.
    pub fn lookup(&self, faq_id: u32, answer_text: &str) -> Option<PathBuf> {
        let item = self.items.get(&faq_id)?;
        if item.answer != answer_text {
            debug!(faq_id, "cached voice answer text is stale");
            return None;
        }
        let path = self.dir.join(&item.file);
        if !path.is_file() {
            debug!(faq_id, path = %path.display(), "cached voice file missing");
            return None;
        }
        Some(path)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Play an audio file through `ffplay`, best effort. Playback failure is
/// logged and swallowed; the turn is already persisted by the time this
/// runs.
pub async fn play_best_effort(path: &Path) {
    let result = tokio::process::Command::new("ffplay")
        .args(["-autoexit", "-nodisp", "-loglevel", "quiet"])
        .arg(path)
        .status()
        .await;
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(path = %path.display(), %status, "playback exited abnormally"),
        Err(e) => warn!(path = %path.display(), error = %e, "playback unavailable, skipping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_index(dir: &Path, json: &str) {
        fs::write(dir.join("index.json"), json).unwrap();
    }

    #[test]
    fn missing_index_yields_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VoiceCache::load(dir.path());
        assert!(cache.is_empty());
        assert!(cache.lookup(1, "anything").is_none());
    }

    #[test]
    fn lookup_requires_verbatim_answer_and_file() {
        let dir = tempfile::tempdir().unwrap();
        write_index(
            dir.path(),
            r#"{"items": [
                {"id": 1, "file": "0001.mp3", "answer": "Բարև ձեզ"},
                {"id": 2, "file": "0002.mp3", "answer": "Ցտեսություն"}
            ]}"#,
        );
        fs::write(dir.path().join("0001.mp3"), b"mp3").unwrap();

        let cache = VoiceCache::load(dir.path());
        assert_eq!(cache.len(), 2);

        // exact answer, file present
        assert_eq!(
            cache.lookup(1, "Բարև ձեզ"),
            Some(dir.path().join("0001.mp3"))
        );
        // answer text drifted
        assert!(cache.lookup(1, "Բարև").is_none());
        // audio file missing on disk
        assert!(cache.lookup(2, "Ցտեսություն").is_none());
        // unknown id
        assert!(cache.lookup(99, "Բարև ձեզ").is_none());
    }

    #[test]
    fn malformed_index_yields_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "{not json");
        let cache = VoiceCache::load(dir.path());
        assert!(cache.is_empty());
    }
}
