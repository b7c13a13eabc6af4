//! Profile registry loading and validation.
//!
//! The registry is a single static TOML document mapping profile names to
//! budgets and tiers, plus the router's ordered rule list and the
//! designated default profile. It is loaded once at process start;
//! changing it requires a restart.
//!
//! ```toml
//! default_profile = "general"
//!
//! [[rules]]
//! keywords = ["css", "layout", "component"]
//! profile = "frontend"
//!
//! [profiles.frontend]
//! max_bytes = 24000
//! tiers = [
//!     { name = "core", topics = ["ui", "components"] },
//!     { name = "extended", topics = ["api"] },
//! ]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::EngineError;
use crate::models::{Profile, Tier};

#[derive(Debug, Deserialize)]
struct RegistryFile {
    default_profile: String,
    #[serde(default)]
    rules: Vec<RuleEntry>,
    profiles: BTreeMap<String, ProfileEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    keywords: Vec<String>,
    profile: String,
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    max_bytes: u64,
    #[serde(default)]
    tiers: Vec<TierEntry>,
}

#[derive(Debug, Deserialize)]
struct TierEntry {
    name: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    pinned: Vec<String>,
}

/// One router classification rule: if any keyword appears as a token of
/// the task text, the named profile is chosen.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub keywords: Vec<String>,
    pub profile: String,
}

/// The loaded, validated profile registry.
///
/// Rules keep the order they appear in the registry file; that order is
/// the router's documented classification order (first match wins).
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
    rules: Vec<RouteRule>,
    default_profile: String,
}

impl ProfileRegistry {
    /// Load the registry from a TOML file and validate every entry.
    ///
    /// Validation failures are [`EngineError::Configuration`] and are
    /// intended to be fatal at startup: a non-positive budget, a default
    /// profile that does not exist, or a rule referencing a missing
    /// profile.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!(
                "failed to read profile registry {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: RegistryFile = toml::from_str(&content).map_err(|e| {
            EngineError::Configuration(format!("failed to parse profile registry: {}", e))
        })?;

        let mut profiles = BTreeMap::new();
        for (name, entry) in file.profiles {
            if entry.max_bytes == 0 {
                return Err(EngineError::Configuration(format!(
                    "profile '{}': max_bytes must be > 0",
                    name
                )));
            }
            for tier in &entry.tiers {
                if tier.name.trim().is_empty() {
                    return Err(EngineError::Configuration(format!(
                        "profile '{}': tier names must not be empty",
                        name
                    )));
                }
            }

            let tiers = entry
                .tiers
                .into_iter()
                .map(|t| Tier {
                    name: t.name,
                    topics: t
                        .topics
                        .iter()
                        .map(|topic| topic.trim().to_lowercase())
                        .filter(|topic| !topic.is_empty())
                        .collect(),
                    pinned: t.pinned,
                })
                .collect();

            profiles.insert(
                name.clone(),
                Profile {
                    name,
                    max_bytes: entry.max_bytes,
                    tiers,
                },
            );
        }

        if !profiles.contains_key(&file.default_profile) {
            return Err(EngineError::Configuration(format!(
                "default_profile '{}' is not defined in the registry",
                file.default_profile
            )));
        }

        let mut rules = Vec::new();
        for rule in file.rules {
            if !profiles.contains_key(&rule.profile) {
                return Err(EngineError::Configuration(format!(
                    "rule references unknown profile '{}'",
                    rule.profile
                )));
            }
            rules.push(RouteRule {
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                profile: rule.profile,
            });
        }

        Ok(Self {
            profiles,
            rules,
            default_profile: file.default_profile,
        })
    }

    /// Find a profile by name.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// The registry's designated default profile.
    pub fn default_profile(&self) -> &Profile {
        // Existence is validated in load().
        &self.profiles[&self.default_profile]
    }

    /// All profiles, name-ordered.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Router rules in classification order.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Count of registered profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
