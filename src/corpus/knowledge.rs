use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AssistantError, Result};

/// One retrievable chunk of the knowledge corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub item_id: String,
    pub source_type: String,
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

/// Read-only knowledge corpus. Retrieval never mutates it, so one instance
/// can back any number of sessions.
#[derive(Debug, Clone)]
pub struct KnowledgeCorpus {
    chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeCorpus {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!(
                "knowledge corpus not readable at {}: {e}",
                path.display()
            ))
        })?;
        let chunks: Vec<KnowledgeChunk> = serde_json::from_str(&raw).map_err(|e| {
            AssistantError::Config(format!("malformed knowledge corpus {}: {e}", path.display()))
        })?;

        info!(path = %path.display(), chunks = chunks.len(), "knowledge corpus loaded");
        Ok(Self { chunks })
    }

    pub fn from_chunks(chunks: Vec<KnowledgeChunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Format retrieved chunks as a prompt context block.
pub fn format_context(chunks: &[KnowledgeChunk]) -> String {
    if chunks.is_empty() {
        return "No knowledge context found.".to_string();
    }
    let mut lines = Vec::with_capacity(chunks.len() * 2);
    for (idx, chunk) in chunks.iter().enumerate() {
        lines.push(format!(
            "[{}] source={}:{}",
            idx + 1,
            chunk.source_type,
            chunk.source
        ));
        lines.push(chunk.text.clone());
    }
    lines.join("\n\n")
}
