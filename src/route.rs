//! Task-to-profile routing.
//!
//! An explicitly requested profile always wins if it exists; an explicit
//! name that is not registered is an error rather than a silent fallback.
//! Without an explicit profile, the task text is classified against the
//! registry's rule list in file order — first match wins, not best match —
//! and an unmatched task falls back to the default profile.

use crate::error::EngineError;
use crate::models::{Profile, Task};
use crate::registry::ProfileRegistry;
use crate::score::tokenize;

/// Resolve the profile for a task.
pub fn route<'a>(
    registry: &'a ProfileRegistry,
    task: &Task,
    explicit_profile: Option<&str>,
) -> Result<&'a Profile, EngineError> {
    if let Some(name) = explicit_profile {
        return registry
            .get(name)
            .ok_or_else(|| EngineError::UnknownProfile(name.to_string()));
    }

    let tokens = tokenize(&task.raw_text);
    for rule in registry.rules() {
        if rule.keywords.iter().any(|k| tokens.contains(k)) {
            // Rule profiles are validated against the registry at load time.
            if let Some(profile) = registry.get(&rule.profile) {
                return Ok(profile);
            }
        }
    }

    Ok(registry.default_profile())
}
