// src/ingest/dedup.rs
//! Fuzzy keyword deduplication.
//!
//! Similarity: `strsim::normalized_levenshtein` on comparison keys, i.e.
//! `(max_len - levenshtein) / max_len` over chars. A candidate whose similarity to any
//! already accepted candidate is strictly above the threshold is dropped; first seen wins.

use strsim::normalized_levenshtein;

use crate::ingest::types::TopicCandidate;

/// Comparison key: lowercase, collapsed whitespace, trailing sentence punctuation stripped.
pub fn comparison_key(keyword: &str) -> String {
    let mut out = keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',' | ';' | ':') {
            out.pop();
        } else {
            break;
        }
    }
    out
}

pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    normalized_levenshtein(a, b)
}

/// Returns the survivors in input order plus the number dropped.
pub fn dedup_candidates(
    candidates: Vec<TopicCandidate>,
    threshold: f64,
) -> (Vec<TopicCandidate>, usize) {
    let mut accepted_keys: Vec<String> = Vec::with_capacity(candidates.len());
    let mut keep = Vec::with_capacity(candidates.len());
    let mut dropped = 0usize;

    for cand in candidates {
        let key = comparison_key(&cand.keyword);
        if accepted_keys.iter().any(|k| similarity(k, &key) > threshold) {
            tracing::debug!(target: "trends", keyword = %cand.keyword, "near-duplicate dropped");
            dropped += 1;
            continue;
        }
        accepted_keys.push(key);
        keep.push(cand);
    }

    (keep, dropped)
}
