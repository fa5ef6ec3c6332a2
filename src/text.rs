//! Text utilities shared by matching, retrieval, and the language gate.

use std::collections::BTreeSet;

/// Normalize text for similarity comparison: lowercase, strip punctuation,
/// collapse whitespace. Armenian letters pass through unchanged.
pub fn normalize_for_similarity(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token set of normalized text. BTreeSet keeps iteration deterministic.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize_for_similarity(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Jaccard similarity between the token sets of two texts.
pub fn token_similarity(a: &str, b: &str) -> f32 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f32 / union as f32
}

fn is_armenian_letter(ch: char) -> bool {
    matches!(ch, 'Ա'..='Ֆ' | 'ա'..='ֆ' | 'և')
}

/// Ratio of Armenian letters among all alphabetic characters.
pub fn armenian_letter_ratio(text: &str) -> f32 {
    let mut letters = 0usize;
    let mut armenian = 0usize;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            letters += 1;
            if is_armenian_letter(ch) {
                armenian += 1;
            }
        }
    }
    if letters == 0 {
        return 0.0;
    }
    armenian as f32 / letters as f32
}

/// Whether text is mostly Armenian, based on a minimum letter count and a
/// minimum ratio among alphabetic characters.
pub fn is_mostly_armenian(text: &str, min_ratio: f32, min_letters: usize) -> bool {
    let armenian_count = text.chars().filter(|c| is_armenian_letter(*c)).count();
    if armenian_count < min_letters {
        return false;
    }
    armenian_letter_ratio(text) >= min_ratio
}
