//! FAQ matching.
//!
//! A transcript is compared against every question variant of every FAQ
//! entry using Jaccard token-set similarity over normalized text. An
//! entry's score is its best variant score. The highest-scoring entry is
//! returned only when the score clears the acceptance bar; among equal top
//! scores the lowest id wins.

use crate::corpus::faq::{FaqCorpus, FaqEntry};
use crate::text::{normalize_for_similarity, token_similarity};

/// Accepted FAQ match with its score and the variant that matched.
#[derive(Debug, Clone)]
pub struct FaqMatch {
    pub entry: FaqEntry,
    pub score: f32,
    pub matched_question: String,
}

#[derive(Debug, Clone)]
pub struct FaqMatcher {
    /// Acceptance bar for the best similarity score (0.0 to 1.0)
    threshold: f32,
}

impl FaqMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Match a transcript against the corpus. Deterministic: entries are
    /// scanned in ascending id order and only a strictly greater score
    /// displaces the current best, so ties resolve to the lowest id.
    pub fn find_match(&self, transcript_text: &str, corpus: &FaqCorpus) -> Option<FaqMatch> {
        if normalize_for_similarity(transcript_text).is_empty() {
            return None;
        }

        let mut best: Option<FaqMatch> = None;
        for entry in corpus.entries() {
            let mut entry_score = 0.0f32;
            let mut entry_question = "";
            for question in &entry.questions {
                let score = token_similarity(transcript_text, question);
                if score > entry_score {
                    entry_score = score;
                    entry_question = question;
                }
            }

            let is_better = match &best {
                None => entry_score > 0.0,
                Some(current) => entry_score > current.score,
            };
            if is_better {
                best = Some(FaqMatch {
                    entry: entry.clone(),
                    score: entry_score,
                    matched_question: entry_question.to_string(),
                });
            }
        }

        best.filter(|m| m.score >= self.threshold)
    }
}
