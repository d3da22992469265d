//! Application state wiring the pipeline, retriever and cache together.
//!
//! The pipeline and retriever are generic over collaborator traits;
//! AppState pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use recall_core::classify::{BoxClassifier, Classifier};
use recall_core::correlation::sweeper::spawn_sweeper;
use recall_core::correlation::{CorrelationCache, EvictionPolicy};
use recall_core::pipeline::TurnClassificationPipeline;
use recall_core::retrieval::SimilarityRetriever;
use recall_infra::classifier::{HttpClassifier, KeywordClassifier};
use recall_infra::config::{load_config, resolve_data_dir};
use recall_infra::sqlite::pool::{database_url, DatabasePool};
use recall_infra::sqlite::turn::SqliteTurnRepository;
use recall_types::config::RecallConfig;
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Environment variable carrying the classifier bearer token.
pub const CLASSIFIER_API_KEY_ENV: &str = "RECALL_CLASSIFIER_API_KEY";

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type ConcretePipeline = TurnClassificationPipeline<BoxClassifier, SqliteTurnRepository>;

pub type ConcreteRetriever = SimilarityRetriever<SqliteTurnRepository>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers. `cache` is the same
/// handle the pipeline holds.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ConcretePipeline>,
    pub retriever: Arc<ConcreteRetriever>,
    pub cache: CorrelationCache,
    pub config: Arc<RecallConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize from the resolved data directory and its `config.toml`.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_config(&data_dir).await;
        Self::open(data_dir, config).await
    }

    /// Connect to the database under `data_dir` and wire the services.
    pub async fn open(data_dir: PathBuf, config: RecallConfig) -> anyhow::Result<Self> {
        let db_url = format!("{}?mode=rwc", database_url(&data_dir, &config.database_file));
        let db_pool = DatabasePool::new(&db_url).await?;

        let classifier = build_classifier(&config)?;
        tracing::info!(classifier = classifier.name(), "Classifier selected");

        let cache = CorrelationCache::new(EvictionPolicy::from_config(&config.cache));
        let pipeline = TurnClassificationPipeline::new(
            classifier,
            SqliteTurnRepository::new(db_pool.clone()),
            cache.clone(),
        );
        let retriever = SimilarityRetriever::new(SqliteTurnRepository::new(db_pool.clone()));

        Ok(Self {
            pipeline: Arc::new(pipeline),
            retriever: Arc::new(retriever),
            cache,
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }

    /// Start the background cache sweeper, unless the policy has no TTL.
    pub fn start_sweeper(&self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if self.cache.policy().ttl.is_none() {
            return None;
        }
        let interval = Duration::from_secs(self.config.cache.sweep_interval_secs.max(1));
        Some(spawn_sweeper(self.cache.clone(), interval, cancel))
    }
}

/// Remote classifier when an endpoint is configured, keyword rules otherwise.
fn build_classifier(config: &RecallConfig) -> anyhow::Result<BoxClassifier> {
    let Some(http) = HttpClassifier::from_config(&config.classifier)? else {
        return Ok(BoxClassifier::new(KeywordClassifier::new()));
    };

    let http = match std::env::var(CLASSIFIER_API_KEY_ENV) {
        Ok(key) if !key.is_empty() => http.with_api_key(SecretString::from(key)),
        _ => http,
    };
    Ok(BoxClassifier::new(http))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State backed by a fresh database in a leaked temp dir.
    pub async fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        AppState::open(data_dir, RecallConfig::default()).await.unwrap()
    }
}
