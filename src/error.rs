//! Typed errors for the selection engine.
//!
//! The split mirrors the engine's propagation policy: errors that affect
//! the correctness of a returned context ([`EngineError`]) surface to the
//! caller, while errors confined to usage observability ([`RecorderError`])
//! are recovered close to where they occur and logged, never failing the
//! primary pack call.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that surface to callers of the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Manifest storage is unreadable or a load timed out. Callers should
    /// fall back to unoptimized full-context behavior.
    #[error("manifest store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed configuration or profile registry. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A dynamically requested profile name is not in the registry.
    #[error("unknown profile: '{0}'")]
    UnknownProfile(String),
}

/// Errors internal to the usage recorder. These never cross the engine
/// boundary as failures; callers log them and continue.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("usage database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("failed to create usage database directory {path}: {reason}")]
    CreateDir { path: PathBuf, reason: String },

    #[error("usage record serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
