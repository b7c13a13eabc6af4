//! Tiered greedy context packing.
//!
//! Given a profile, a task, and a loaded store snapshot, selects a subset
//! of documents maximizing cumulative relevance subject to the profile's
//! byte budget. This is a deliberate simplification over full knapsack
//! optimization: tiers are filled in priority order and candidates are
//! walked greedily, which keeps selection predictable for fixed inputs.
//!
//! Budget handling: a candidate that would overflow the budget is skipped
//! (never truncated), and the walk continues so smaller candidates later in
//! the same tier can still fit. Every tier is checked against the same hard
//! budget; there is no graduated margin for lower tiers.

use uuid::Uuid;

use crate::models::{Document, Profile, SelectedDocument, SelectionResult, Task};
use crate::score::Scorer;

/// Pack a snapshot of store documents for one profile and task.
///
/// Guarantees:
/// - `total_bytes <= profile.max_bytes` always;
/// - deterministic output for fixed inputs (score descending, then name
///   ascending within a tier);
/// - each document appears at most once even if it matches multiple tiers;
/// - a profile matching zero documents yields an empty, valid result.
pub fn pack(
    profile: &Profile,
    task: &Task,
    documents: &[Document],
    scorer: &dyn Scorer,
) -> SelectionResult {
    let baseline: u64 = documents.iter().map(|d| d.size_bytes).sum();

    // Scores are per (task, document); tier membership never changes them.
    let scores: Vec<f64> = documents
        .iter()
        .map(|d| scorer.score(task, d, profile))
        .collect();

    let mut selected: Vec<SelectedDocument> = Vec::new();
    let mut total_bytes: u64 = 0;

    for tier in &profile.tiers {
        struct Candidate<'a> {
            document: &'a Document,
            score: f64,
            pinned: bool,
        }

        let mut candidates: Vec<Candidate> = documents
            .iter()
            .zip(scores.iter())
            .filter(|(doc, _)| !selected.iter().any(|s| s.name == doc.name))
            .filter_map(|(doc, score)| {
                let pinned = tier.pinned.iter().any(|p| p == &doc.name);
                let matches_topics = doc.topics.iter().any(|t| tier.topics.contains(t));
                if pinned || matches_topics {
                    Some(Candidate {
                        document: doc,
                        score: *score,
                        pinned,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Pinned first, then score descending, then name ascending.
        candidates.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then(
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.document.name.cmp(&b.document.name))
        });

        for candidate in candidates {
            if total_bytes + candidate.document.size_bytes <= profile.max_bytes {
                total_bytes += candidate.document.size_bytes;
                selected.push(SelectedDocument {
                    name: candidate.document.name.clone(),
                    size_bytes: candidate.document.size_bytes,
                    tier: tier.name.clone(),
                    score: candidate.score,
                });
            }
            // Overflow: skip and keep walking smaller remaining candidates.
        }
    }

    let reduction_ratio = if baseline > 0 {
        1.0 - total_bytes as f64 / baseline as f64
    } else {
        0.0
    };

    SelectionResult {
        selection_id: Uuid::new_v4().to_string(),
        profile_name: profile.name.clone(),
        documents_selected: selected,
        total_bytes,
        budget_bytes: profile.max_bytes,
        reduction_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;
    use crate::score::TaskKeywordScorer;

    fn make_document(name: &str, topics: &[&str], size_bytes: u64) -> Document {
        Document {
            name: name.to_string(),
            content: "x".repeat(size_bytes as usize),
            size_bytes,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn make_tier(name: &str, topics: &[&str]) -> Tier {
        Tier {
            name: name.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            pinned: vec![],
        }
    }

    fn make_profile(name: &str, max_bytes: u64, tiers: Vec<Tier>) -> Profile {
        Profile {
            name: name.to_string(),
            max_bytes,
            tiers,
        }
    }

    fn names(result: &SelectionResult) -> Vec<&str> {
        result
            .documents_selected
            .iter()
            .map(|d| d.name.as_str())
            .collect()
    }

    #[test]
    fn test_small_fit() {
        let docs = vec![
            make_document("A", &["api"], 5000),
            make_document("B", &["ui"], 3000),
        ];
        let profile = make_profile("backend", 10000, vec![make_tier("core", &["api"])]);
        let result = pack(
            &profile,
            &Task::new("build api endpoint"),
            &docs,
            &TaskKeywordScorer,
        );
        assert_eq!(names(&result), vec!["A"]);
        assert_eq!(result.total_bytes, 5000);
        assert_eq!(result.budget_bytes, 10000);
    }

    #[test]
    fn test_overflow_skip_not_truncate() {
        let docs = vec![
            make_document("A", &["api"], 5000),
            make_document("B", &["ui"], 3000),
        ];
        let profile = make_profile("backend", 4000, vec![make_tier("core", &["api"])]);
        let result = pack(
            &profile,
            &Task::new("build api endpoint"),
            &docs,
            &TaskKeywordScorer,
        );
        assert!(result.documents_selected.is_empty());
        assert_eq!(result.total_bytes, 0);
    }

    #[test]
    fn test_skip_large_does_not_block_smaller_in_same_tier() {
        // "big" scores 1.0, "small" 0.5, so "big" is walked first.
        let docs = vec![
            make_document("big", &["api"], 9000),
            make_document("small", &["api", "caching"], 2000),
        ];
        let profile = make_profile("backend", 3000, vec![make_tier("core", &["api"])]);
        let result = pack(
            &profile,
            &Task::new("build api endpoint"),
            &docs,
            &TaskKeywordScorer,
        );
        // big (score 1.0) exceeds the budget and is skipped; small still fits.
        assert_eq!(names(&result), vec!["small"]);
        assert_eq!(result.total_bytes, 2000);
    }

    #[test]
    fn test_budget_invariant_many_documents() {
        let docs: Vec<Document> = (0..20)
            .map(|i| make_document(&format!("d{:02}", i), &["api"], 700 + i * 100))
            .collect();
        let profile = make_profile("backend", 5000, vec![make_tier("core", &["api"])]);
        let result = pack(&profile, &Task::new("api work"), &docs, &TaskKeywordScorer);
        assert!(result.total_bytes <= profile.max_bytes);
    }

    #[test]
    fn test_deterministic_selection() {
        let docs = vec![
            make_document("alpha", &["api"], 1000),
            make_document("beta", &["api"], 1000),
            make_document("gamma", &["api"], 1000),
        ];
        let profile = make_profile("backend", 2500, vec![make_tier("core", &["api"])]);
        let task = Task::new("api");
        let r1 = pack(&profile, &task, &docs, &TaskKeywordScorer);
        let r2 = pack(&profile, &task, &docs, &TaskKeywordScorer);
        assert_eq!(names(&r1), names(&r2));
        assert_eq!(r1.total_bytes, r2.total_bytes);
        // Equal scores tie-break by name ascending.
        assert_eq!(names(&r1), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_no_duplicate_across_tiers() {
        let docs = vec![make_document("shared", &["api", "ui"], 1000)];
        let profile = make_profile(
            "full",
            10000,
            vec![make_tier("core", &["api"]), make_tier("extended", &["ui"])],
        );
        let result = pack(&profile, &Task::new("api ui"), &docs, &TaskKeywordScorer);
        assert_eq!(names(&result), vec!["shared"]);
        assert_eq!(result.documents_selected[0].tier, "core");
    }

    #[test]
    fn test_tier_priority_dominates_relevance() {
        // Both fit independently, only one can fit overall. The higher-priority
        // tier's document wins even though the lower tier's scores higher.
        let docs = vec![
            make_document("core-doc", &["overview", "internals"], 800),
            make_document("opt-doc", &["api"], 800),
        ];
        let profile = make_profile(
            "agent",
            1000,
            vec![
                make_tier("core", &["overview"]),
                make_tier("optional", &["api"]),
            ],
        );
        // Task matches "api" fully (score 1.0 for opt-doc) and only half of
        // core-doc's topics (score 0.5).
        let result = pack(
            &profile,
            &Task::new("document the api overview"),
            &docs,
            &TaskKeywordScorer,
        );
        assert_eq!(names(&result), vec!["core-doc"]);
    }

    #[test]
    fn test_empty_match_is_valid_result() {
        let docs = vec![make_document("A", &["api"], 1000)];
        let profile = make_profile("frontend", 10000, vec![make_tier("core", &["ui"])]);
        let result = pack(&profile, &Task::new("anything"), &docs, &TaskKeywordScorer);
        assert!(result.documents_selected.is_empty());
        assert_eq!(result.total_bytes, 0);
        assert_eq!(result.profile_name, "frontend");
    }

    #[test]
    fn test_empty_store() {
        let profile = make_profile("backend", 10000, vec![make_tier("core", &["api"])]);
        let result = pack(&profile, &Task::new("api"), &[], &TaskKeywordScorer);
        assert_eq!(result.total_bytes, 0);
        assert_eq!(result.reduction_ratio, 0.0);
    }

    #[test]
    fn test_reduction_ratio_against_full_store() {
        let docs = vec![
            make_document("A", &["api"], 6000),
            make_document("B", &["ui"], 4000),
        ];
        let profile = make_profile("backend", 10000, vec![make_tier("core", &["api"])]);
        let result = pack(&profile, &Task::new("api"), &docs, &TaskKeywordScorer);
        // 6000 of 10000 baseline bytes selected => 40% reduction.
        assert!((result.reduction_ratio - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_pinned_document_included_without_topic_match() {
        let docs = vec![
            make_document("conventions", &[], 500),
            make_document("A", &["api"], 1000),
        ];
        let mut tier = make_tier("core", &["api"]);
        tier.pinned = vec!["conventions".to_string()];
        let profile = make_profile("backend", 10000, vec![tier]);
        let result = pack(&profile, &Task::new("build api"), &docs, &TaskKeywordScorer);
        // Pinned documents are walked ahead of scored candidates.
        assert_eq!(names(&result), vec!["conventions", "A"]);
    }

    #[test]
    fn test_pinned_still_subject_to_budget() {
        let docs = vec![make_document("conventions", &[], 5000)];
        let mut tier = make_tier("core", &["api"]);
        tier.pinned = vec!["conventions".to_string()];
        let profile = make_profile("backend", 1000, vec![tier]);
        let result = pack(&profile, &Task::new("build api"), &docs, &TaskKeywordScorer);
        assert!(result.documents_selected.is_empty());
    }
}
