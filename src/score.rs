//! Task-to-document relevance scoring.
//!
//! The baseline scorer is an explicit keyword heuristic, not a learned
//! model: task text is tokenized into lowercase keywords and matched
//! against document topic tags by exact token equality. The [`Scorer`]
//! trait is the seam for swapping in an embedding-based or learned
//! implementation without changing callers.

use std::collections::BTreeSet;

use crate::models::{Document, Profile, Task};

/// Maps a (task, document) pair to a relevance score in `[0, 1]`.
///
/// Implementations must be deterministic: identical inputs yield identical
/// scores, with no randomness and no external state. The profile is passed
/// through so future implementations can weight by topic affinity; tier
/// membership must never change the score itself — it only affects packing
/// order.
pub trait Scorer: Send + Sync {
    fn score(&self, task: &Task, document: &Document, profile: &Profile) -> f64;
}

/// Keyword-overlap scorer.
///
/// `score = |task tokens ∩ document topics| / max(1, |document topics|)`.
/// Matching is exact-token, case-insensitive (topics are lowercased at
/// load time). A document with an empty topic set scores 0 for every task.
#[derive(Debug, Default)]
pub struct TaskKeywordScorer;

impl Scorer for TaskKeywordScorer {
    fn score(&self, task: &Task, document: &Document, _profile: &Profile) -> f64 {
        if document.topics.is_empty() {
            return 0.0;
        }

        let tokens = tokenize(&task.raw_text);
        let matched = document
            .topics
            .iter()
            .filter(|topic| tokens.contains(topic.as_str()))
            .count();

        matched as f64 / document.topics.len().max(1) as f64
    }
}

/// Tokenize free text into lowercase keywords: whitespace-delimited, with
/// leading/trailing punctuation stripped from each token. Empty tokens are
/// dropped. Shared by the scorer and the router so both classify the same
/// token set.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}
