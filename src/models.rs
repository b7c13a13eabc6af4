//! Core data models used throughout Prism.
//!
//! These types represent the manifest documents, agent profiles, and
//! selection results that flow through the route → score → pack pipeline.

use std::collections::BTreeSet;

use serde::Serialize;

/// A manifest document loaded from the store.
///
/// Immutable once loaded; documents are re-read from storage at query time
/// and discarded after the call.
#[derive(Debug, Clone)]
pub struct Document {
    /// Unique within a store snapshot (filename sans extension).
    pub name: String,
    /// Free-text content handed to the agent when selected.
    pub content: String,
    /// Byte length of `content`.
    pub size_bytes: u64,
    /// Topic tags, lowercased. May be empty, in which case the document
    /// scores 0 for every task and is only reachable via tier pinning.
    pub topics: BTreeSet<String>,
}

/// A priority bucket within a profile.
///
/// Tiers are ordered by descending priority (e.g. "core" before "extended"
/// before "optional"). A document is a candidate for a tier when its topics
/// intersect the tier's topic set, or when it is named in `pinned` —
/// pinned documents are admitted ahead of scored candidates regardless of
/// relevance, still subject to the budget.
#[derive(Debug, Clone)]
pub struct Tier {
    pub name: String,
    pub topics: BTreeSet<String>,
    pub pinned: Vec<String>,
}

/// A named agent configuration: context budget plus ordered tiers.
///
/// Profiles are static configuration, loaded once at process start.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub max_bytes: u64,
    pub tiers: Vec<Tier>,
}

/// The per-call input: a free-text task description.
#[derive(Debug, Clone)]
pub struct Task {
    pub raw_text: String,
}

impl Task {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

/// One selected document within a [`SelectionResult`].
#[derive(Debug, Clone, Serialize)]
pub struct SelectedDocument {
    pub name: String,
    pub size_bytes: u64,
    /// Name of the tier that admitted this document.
    pub tier: String,
    /// Relevance score at selection time.
    pub score: f64,
}

/// The outcome of a single pack call.
///
/// Invariant: `total_bytes <= budget_bytes`. A document that would overflow
/// the budget is skipped, never truncated. Insertion order of
/// `documents_selected` is selection order.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    pub selection_id: String,
    pub profile_name: String,
    pub documents_selected: Vec<SelectedDocument>,
    pub total_bytes: u64,
    pub budget_bytes: u64,
    /// Size reduction vs. shipping the full store snapshot: 1 − total/baseline,
    /// 0.0 for an empty store.
    pub reduction_ratio: f64,
}

impl SelectionResult {
    /// The boundary shape serialized at process edges (CLI `--json`, HTTP).
    pub fn report(&self) -> SelectionReport {
        SelectionReport {
            profile_name: self.profile_name.clone(),
            documents_selected: self
                .documents_selected
                .iter()
                .map(|d| d.name.clone())
                .collect(),
            total_bytes: self.total_bytes,
            budget_bytes: self.budget_bytes,
            reduction_ratio: self.reduction_ratio,
        }
    }
}

/// Selection result as exposed at a process boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub profile_name: String,
    pub documents_selected: Vec<String>,
    pub total_bytes: u64,
    pub budget_bytes: u64,
    pub reduction_ratio: f64,
}

/// One entry of the append-only usage log.
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    /// Unix timestamp of the append.
    pub recorded_at: i64,
    pub profile_name: String,
    /// First 200 characters of the task text.
    pub task_excerpt: String,
    pub documents_selected: Vec<String>,
    pub total_bytes: u64,
    pub budget_bytes: u64,
}
