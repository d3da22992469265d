//! Configuration types for Relevantic Recall.
//!
//! `RecallConfig` represents the top-level `config.toml` that controls the
//! correlation cache eviction policy, the classifier endpoint, and the
//! database location.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.recall/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallConfig {
    /// SQLite database file name, relative to the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

fn default_database_file() -> String {
    "recall.db".to_string()
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            cache: CacheConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Correlation cache eviction settings.
///
/// A value of `0` disables the corresponding bound, restoring indefinite
/// retention of unpaired user turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age after which an unpaired user turn is abandoned.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of unpaired user turns held at once.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// How often the background sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

fn default_max_entries() -> usize {
    10_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Classifier backend settings.
///
/// With no `endpoint`, the offline keyword classifier is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout. `0` disables it.
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_classifier_timeout_secs() -> u64 {
    30
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_classifier_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_config_default_values() {
        let config = RecallConfig::default();
        assert_eq!(config.database_file, "recall.db");
        assert_eq!(config.cache.ttl_secs, 1800);
        assert_eq!(config.cache.max_entries, 10_000);
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert!(config.classifier.endpoint.is_none());
    }

    #[test]
    fn test_recall_config_deserialize_with_defaults() {
        let config: RecallConfig = toml::from_str("").unwrap();
        assert_eq!(config, RecallConfig::default());
    }

    #[test]
    fn test_recall_config_deserialize_with_values() {
        let toml_str = r#"
database_file = "turns.db"

[cache]
ttl_secs = 0
max_entries = 500

[classifier]
endpoint = "http://localhost:8080/classify"
timeout_secs = 5
"#;
        let config: RecallConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_file, "turns.db");
        assert_eq!(config.cache.ttl_secs, 0);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert_eq!(
            config.classifier.endpoint.as_deref(),
            Some("http://localhost:8080/classify")
        );
        assert_eq!(config.classifier.timeout_secs, 5);
    }

    #[test]
    fn test_recall_config_serde_roundtrip() {
        let config = RecallConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RecallConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
