//! Deterministic fingerprint derivation.
//!
//! The semantic hash is the hex SHA-256 of the normalized text, so inputs
//! that differ only in casing, punctuation or spacing share a fingerprint.
//! Key terms are the most frequent non-stopwords, ties broken by first
//! occurrence.

use std::collections::HashMap;

use indexmap::IndexSet;
use sha2::{Digest, Sha256};

use narragraph_core::fingerprint::ContentFingerprint;

use crate::{complexity, cues::CueCounts, tokens};

/// Default number of key terms kept per fingerprint
pub const DEFAULT_KEY_TERMS: usize = 10;

/// Minimum length of a word to qualify as a key term
const MIN_TERM_CHARS: usize = 3;

/// Derive the fingerprint of `text`, keeping at most `key_term_limit` key terms.
///
/// # Examples
///
/// ```
/// # use narragraph_text::fingerprint;
/// let a = fingerprint("Collect input, then store it.", 10);
/// let b = fingerprint("collect INPUT then store it", 10);
/// assert_eq!(a.semantic_hash(), b.semantic_hash());
/// ```
pub fn fingerprint(text: &str, key_term_limit: usize) -> ContentFingerprint {
    let words = tokens::words(text);
    let counts = CueCounts::scan(&words);

    ContentFingerprint::new(
        sha256_hex(&tokens::normalize(text)),
        counts.structure_pattern(),
        key_terms(&words, key_term_limit),
        complexity::score(text),
        counts.diagram_hint(),
    )
}

fn sha256_hex(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

fn key_terms(words: &[String], limit: usize) -> IndexSet<String> {
    let mut frequency: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in words.iter().enumerate() {
        if word.chars().count() < MIN_TERM_CHARS
            || tokens::is_stopword(word)
            || word.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        frequency.entry(word.as_str()).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = frequency
        .into_iter()
        .map(|(word, (count, first_seen))| (word, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(word, _, _)| word.to_string())
        .collect()
}
