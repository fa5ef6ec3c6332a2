//! Relevance retrieval over the knowledge corpus.
//!
//! Scoring is query-token coverage: the fraction of query tokens present in
//! a chunk, plus a small bonus for FAQ-sourced chunks. Stateless and
//! deterministic: identical inputs always yield the same ordering.

use crate::corpus::knowledge::{KnowledgeChunk, KnowledgeCorpus};
use crate::text::tokenize;

/// Additive score bonus for chunks distilled from the FAQ.
const FAQ_SOURCE_BONUS: f32 = 0.15;

#[derive(Debug, Clone, Default)]
pub struct KnowledgeRetriever;

impl KnowledgeRetriever {
    pub fn new() -> Self {
        Self
    }

    /// Return up to `k` most relevant chunks, best first. Ties resolve to
    /// corpus order. An empty result is valid.
    pub fn retrieve(&self, query: &str, corpus: &KnowledgeCorpus, k: usize) -> Vec<KnowledgeChunk> {
        if k == 0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f32, usize)> = Vec::new();
        for (position, chunk) in corpus.chunks().iter().enumerate() {
            let chunk_tokens = tokenize(&chunk.text);
            if chunk_tokens.is_empty() {
                continue;
            }
            let overlap = query_tokens.intersection(&chunk_tokens).count();
            if overlap == 0 {
                continue;
            }
            let mut score = overlap as f32 / query_tokens.len() as f32;
            if chunk.source_type == "faq" {
                score += FAQ_SOURCE_BONUS;
            }
            scored.push((score, position));
        }

        // Score descending, corpus position ascending for equal scores
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(_, position)| corpus.chunks()[position].clone())
            .collect()
    }
}
