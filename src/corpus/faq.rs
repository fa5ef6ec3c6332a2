use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AssistantError, Result};

/// One canned question/answer pair. Each id maps to exactly one answer;
/// `questions` holds the phrase variants compared against transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: u32,
    pub questions: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
struct FaqFile {
    items: Vec<FaqEntry>,
}

/// Read-only FAQ corpus, loaded once per session. Entries are kept sorted
/// by id so matching walks them in deterministic order.
#[derive(Debug, Clone)]
pub struct FaqCorpus {
    entries: Vec<FaqEntry>,
}

impl FaqCorpus {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!("FAQ corpus not readable at {}: {e}", path.display()))
        })?;
        let file: FaqFile = serde_json::from_str(&raw).map_err(|e| {
            AssistantError::Config(format!("malformed FAQ corpus {}: {e}", path.display()))
        })?;

        let corpus = Self::from_entries(file.items)?;
        info!(path = %path.display(), entries = corpus.len(), "FAQ corpus loaded");
        Ok(corpus)
    }

    /// Validate and order entries. A duplicate id with a different answer is
    /// a configuration fault; the id-to-answer mapping must be unique.
    pub fn from_entries(items: Vec<FaqEntry>) -> Result<Self> {
        let mut by_id: BTreeMap<u32, FaqEntry> = BTreeMap::new();
        for entry in items {
            let answer = entry.answer.trim();
            if answer.is_empty() {
                continue;
            }
            let questions: Vec<String> = entry
                .questions
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            if questions.is_empty() {
                continue;
            }
            let cleaned = FaqEntry {
                id: entry.id,
                questions,
                answer: answer.to_string(),
            };
            if let Some(existing) = by_id.get(&entry.id) {
                if existing.answer != cleaned.answer {
                    return Err(AssistantError::Config(format!(
                        "duplicate FAQ id {} with different answers",
                        entry.id
                    )));
                }
                continue;
            }
            by_id.insert(entry.id, cleaned);
        }

        Ok(Self {
            entries: by_id.into_values().collect(),
        })
    }

    /// Entries in ascending id order.
    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn get(&self, id: u32) -> Option<&FaqEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
