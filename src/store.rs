//! Manifest store access.
//!
//! Documents live as files in a configurable directory — one file per
//! document, filename (sans extension) is the document name. Recognized
//! extensions: `.json` (manifest object with a `topics` array and optional
//! `content` string), `.md` and `.txt` (free text, with topics optionally
//! declared in a leading `---` front-matter block as `topics: a, b, c`).
//!
//! The store is read-only from the engine's perspective: documents are
//! loaded fresh for each pack call and discarded afterwards. Writers are
//! expected to replace manifests atomically, so readers never observe a
//! half-written file. An overall load timeout maps slow or wedged storage
//! to [`EngineError::StoreUnavailable`] rather than hanging the caller.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::error::EngineError;
use crate::models::Document;

const RECOGNIZED_EXTENSIONS: &[&str] = &["md", "txt", "json"];

/// A source of manifest documents.
///
/// The filesystem store is the built-in implementation; the trait is the
/// seam for alternative backends (an object store, a remote cache) without
/// changing the engine.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Returns the source label used in logs and errors.
    fn name(&self) -> &str;

    /// Load a full snapshot of the store, sorted by document name.
    async fn load(&self) -> Result<Vec<Document>, EngineError>;
}

/// Directory-backed manifest store.
pub struct FsManifestStore {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    read_timeout: Duration,
}

impl FsManifestStore {
    pub fn from_config(config: &StoreConfig) -> Result<Self, EngineError> {
        Ok(Self {
            root: config.root.clone(),
            include: build_globset(&config.include_globs)?,
            exclude: build_globset(&config.exclude_globs)?,
            read_timeout: Duration::from_secs(config.read_timeout_secs),
        })
    }
}

#[async_trait]
impl ManifestSource for FsManifestStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn load(&self) -> Result<Vec<Document>, EngineError> {
        let root = self.root.clone();
        let include = self.include.clone();
        let exclude = self.exclude.clone();

        let scan = tokio::task::spawn_blocking(move || scan_store(&root, &include, &exclude));

        match tokio::time::timeout(self.read_timeout, scan).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EngineError::StoreUnavailable(format!(
                "store scan task failed: {}",
                join_err
            ))),
            Err(_) => Err(EngineError::StoreUnavailable(format!(
                "store load timed out after {}s",
                self.read_timeout.as_secs()
            ))),
        }
    }
}

fn scan_store(root: &Path, include: &GlobSet, exclude: &GlobSet) -> Result<Vec<Document>, EngineError> {
    if !root.exists() {
        return Err(EngineError::StoreUnavailable(format!(
            "store root does not exist: {}",
            root.display()
        )));
    }

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            EngineError::StoreUnavailable(format!("store scan failed: {}", e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude.is_match(&rel_str) || !include.is_match(&rel_str) {
            continue;
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !RECOGNIZED_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        paths.push((rel_str, path.to_path_buf()));
    }

    // Sort by relative path for deterministic ordering; duplicate document
    // names keep the lexicographically first file.
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    let mut documents: Vec<Document> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for (rel_str, path) in paths {
        let name = match path.file_stem() {
            Some(stem) => stem.to_string_lossy().to_string(),
            None => continue,
        };

        if !seen.insert(name.clone()) {
            warn!(document = %name, file = %rel_str, "duplicate document name, keeping first");
            continue;
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            EngineError::StoreUnavailable(format!("failed to read {}: {}", path.display(), e))
        })?;

        match parse_document(&name, &path, &raw) {
            Some(doc) => documents.push(doc),
            None => {
                warn!(document = %name, file = %rel_str, "skipping malformed manifest");
                seen.remove(&name);
            }
        }
    }

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}

fn parse_document(name: &str, path: &Path, raw: &str) -> Option<Document> {
    let is_json = path
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (topics, content) = if is_json {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let topics = value
            .get("topics")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str())
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect::<BTreeSet<String>>()
            })
            .unwrap_or_default();
        let content = value
            .get("content")
            .and_then(|c| c.as_str())
            .map(|c| c.to_string())
            .unwrap_or_else(|| raw.to_string());
        (topics, content)
    } else {
        parse_front_matter(raw)
    };

    let size_bytes = content.len() as u64;
    Some(Document {
        name: name.to_string(),
        content,
        size_bytes,
        topics,
    })
}

/// Split an optional leading `---` front-matter block from text content.
/// Only a `topics:` line inside the block is interpreted; the block itself
/// is not part of the document content.
fn parse_front_matter(raw: &str) -> (BTreeSet<String>, String) {
    let Some(rest) = raw.strip_prefix("---\n") else {
        return (BTreeSet::new(), raw.to_string());
    };
    let Some(end) = rest.find("\n---") else {
        return (BTreeSet::new(), raw.to_string());
    };

    let block = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n').to_string();

    let topics = block
        .lines()
        .find_map(|line| line.strip_prefix("topics:"))
        .map(|list| {
            list.split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    (topics, body)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, EngineError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            EngineError::Configuration(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| EngineError::Configuration(format!("failed to build glob set: {}", e)))
}
