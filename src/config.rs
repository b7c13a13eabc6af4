use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding one manifest file per document.
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
        "**/*.json".to_string(),
    ]
}

fn default_read_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Path to the profile registry TOML document.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsageConfig {
    #[serde(default = "default_usage_path")]
    pub path: PathBuf,
    /// Maximum retained usage records; older rows are deleted on append.
    #[serde(default = "default_retain")]
    pub retain: u32,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            path: default_usage_path(),
            retain: default_retain(),
        }
    }
}

fn default_usage_path() -> PathBuf {
    PathBuf::from("./data/prism.sqlite")
}

fn default_retain() -> u32 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied after parsing:
/// `PRISM_STORE_ROOT`, `PRISM_REGISTRY_PATH`, and `PRISM_USAGE_DB` replace
/// `store.root`, `registry.path`, and `usage.path` respectively.
pub fn load_config(path: &Path) -> Result<Config, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut config: Config = toml::from_str(&content)
        .map_err(|e| EngineError::Configuration(format!("failed to parse config file: {}", e)))?;

    if let Ok(root) = std::env::var("PRISM_STORE_ROOT") {
        config.store.root = PathBuf::from(root);
    }
    if let Ok(registry) = std::env::var("PRISM_REGISTRY_PATH") {
        config.registry.path = PathBuf::from(registry);
    }
    if let Ok(db) = std::env::var("PRISM_USAGE_DB") {
        config.usage.path = PathBuf::from(db);
    }

    if config.store.include_globs.is_empty() {
        return Err(EngineError::Configuration(
            "store.include_globs must not be empty".to_string(),
        ));
    }

    if config.store.read_timeout_secs == 0 {
        return Err(EngineError::Configuration(
            "store.read_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.usage.retain == 0 {
        return Err(EngineError::Configuration(
            "usage.retain must be > 0".to_string(),
        ));
    }

    Ok(config)
}
