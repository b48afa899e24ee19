use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

/// Tuning knobs for a [`crate::ResolutionContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Maximum resolved methods and constructors kept per member kind
    pub member_cache_capacity: usize,
    /// Maximum compiled accessor chains kept
    pub chain_cache_capacity: usize,
    /// Maximum dotted-prefix type lookups kept
    pub type_name_cache_capacity: usize,
    /// Disable to resolve every access from scratch
    pub cache_enabled: bool,
    /// First-segment token naming the root object
    pub self_token: String,
    /// Pseudo-property giving the length of an array
    pub length_token: String,
    /// Try `name()` as an accessor after `getName()` and `isName()`
    pub bare_name_accessors: bool,
    /// Writing an unknown first segment creates a variable in the scope
    pub create_missing_variables: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            member_cache_capacity: 4096,
            chain_cache_capacity: 1024,
            type_name_cache_capacity: 512,
            cache_enabled: true,
            self_token: "this".to_string(),
            length_token: "length".to_string(),
            bare_name_accessors: true,
            create_missing_variables: true,
        }
    }
}

impl AccessConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }

    /// Applies `FP_ACCESS_*` environment overrides on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(enabled) = env_true("FP_ACCESS_CACHE") {
            self.cache_enabled = enabled;
        }
        if let Some(capacity) = env_usize("FP_ACCESS_MEMBER_CACHE_CAPACITY") {
            self.member_cache_capacity = capacity;
        }
        if let Some(capacity) = env_usize("FP_ACCESS_CHAIN_CACHE_CAPACITY") {
            self.chain_cache_capacity = capacity;
        }
        if let Some(capacity) = env_usize("FP_ACCESS_TYPE_NAME_CACHE_CAPACITY") {
            self.type_name_cache_capacity = capacity;
        }
        if let Some(enabled) = env_true("FP_ACCESS_BARE_NAME_ACCESSORS") {
            self.bare_name_accessors = enabled;
        }
        self
    }

    /// Default config with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AccessConfig::from_toml_str(
            r#"
chain_cache_capacity = 8
self_token = "self"
"#,
        )
        .unwrap();
        assert_eq!(config.chain_cache_capacity, 8);
        assert_eq!(config.self_token, "self");
        assert_eq!(config.member_cache_capacity, 4096);
        assert!(config.cache_enabled);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(AccessConfig::from_toml_str("chain_cache_capacity = \"many\"").is_err());
    }
}
