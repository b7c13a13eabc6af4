//! Engine assembly and the select pipeline.
//!
//! The engine is an explicit per-process instance — constructed once from
//! config and passed by reference to every call site (CLI command or HTTP
//! handler). There is no ambient global state.
//!
//! A select call runs: route → load store snapshot → score + pack →
//! best-effort usage record. Only the first two stages can fail; recording
//! failures are logged and never surfaced.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::models::{SelectionResult, Task, UsageRecord};
use crate::pack::pack;
use crate::recorder::UsageRecorder;
use crate::registry::ProfileRegistry;
use crate::route::route;
use crate::score::{Scorer, TaskKeywordScorer};
use crate::store::{FsManifestStore, ManifestSource};

pub struct Engine {
    registry: ProfileRegistry,
    store: Box<dyn ManifestSource>,
    scorer: Box<dyn Scorer>,
    recorder: Option<UsageRecorder>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("recorder", &self.recorder.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from configuration.
    ///
    /// Registry and store configuration problems are fatal
    /// ([`EngineError::Configuration`]); an unavailable usage database is
    /// not — the engine runs without recording and logs a warning.
    pub async fn from_config(config: &Config) -> Result<Self, EngineError> {
        let registry = ProfileRegistry::load(&config.registry.path)?;
        let store = FsManifestStore::from_config(&config.store)?;

        let recorder = match UsageRecorder::open(&config.usage).await {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                warn!(error = %e, "usage recorder unavailable, packing decisions will not be logged");
                None
            }
        };

        Ok(Self {
            registry,
            store: Box::new(store),
            scorer: Box::new(TaskKeywordScorer),
            recorder,
        })
    }

    /// Replace the relevance scorer (e.g. with a learned implementation).
    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Route, pack, and record one selection.
    ///
    /// On [`EngineError::StoreUnavailable`] the caller must fall back to
    /// unoptimized full-context behavior; no partial result is returned.
    pub async fn select(
        &self,
        task_text: &str,
        explicit_profile: Option<&str>,
    ) -> Result<SelectionResult, EngineError> {
        let task = Task::new(task_text);
        let profile = route(&self.registry, &task, explicit_profile)?;
        let documents = self.store.load().await?;

        let result = pack(profile, &task, &documents, self.scorer.as_ref());
        debug!(
            profile = %result.profile_name,
            selected = result.documents_selected.len(),
            total_bytes = result.total_bytes,
            reduction = %format!("{:.3}", result.reduction_ratio),
            "packed context"
        );

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(&result, &task).await {
                warn!(error = %e, "failed to append usage record");
            }
        }

        Ok(result)
    }

    /// Most recent usage records, newest first. Degrades to empty when the
    /// recorder is unavailable.
    pub async fn recent_usage(&self, limit: i64) -> Vec<UsageRecord> {
        match &self.recorder {
            Some(recorder) => recorder.query_recent(limit).await,
            None => {
                warn!("usage recorder unavailable, no records to return");
                Vec::new()
            }
        }
    }

    pub async fn close(&self) {
        if let Some(recorder) = &self.recorder {
            recorder.close().await;
        }
    }
}
