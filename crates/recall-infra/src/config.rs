//! Configuration loader for Relevantic Recall.
//!
//! Reads `config.toml` from the data directory (`~/.recall/` by default)
//! and deserializes it into [`RecallConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use recall_types::config::RecallConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RECALL_DATA_DIR";

/// Resolve the data directory: `RECALL_DATA_DIR`, else `~/.recall`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".recall")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RecallConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> RecallConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RecallConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RecallConfig::default();
        }
    };

    match toml::from_str::<RecallConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RecallConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config, RecallConfig::default());
        assert_eq!(config.cache.ttl_secs, 1800);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
database_file = "turns.db"

[cache]
ttl_secs = 0
max_entries = 50

[classifier]
endpoint = "http://localhost:9000/classify"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.database_file, "turns.db");
        assert_eq!(config.cache.ttl_secs, 0);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert_eq!(
            config.classifier.endpoint.as_deref(),
            Some("http://localhost:9000/classify")
        );
        assert_eq!(config.classifier.timeout_secs, 30);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config, RecallConfig::default());
    }

    #[test]
    fn resolve_data_dir_ends_in_recall_without_override() {
        // Only assert the fallback shape; the env var may be set by the runner.
        if std::env::var(DATA_DIR_ENV).is_err() {
            assert!(resolve_data_dir().ends_with(".recall"));
        }
    }
}
