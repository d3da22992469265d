//! HttpClassifier -- [`Classifier`] backed by a remote labeling service.
//!
//! POSTs `{"content": "..."}` to the configured endpoint and expects
//! `{"classification_id": n}` back. The optional bearer token is wrapped in
//! [`secrecy::SecretString`] and only exposed when building the request.

use std::time::Duration;

use recall_core::classify::Classifier;
use recall_types::classification::ClassificationId;
use recall_types::config::ClassifierConfig;
use recall_types::error::ClassifierError;
use recall_types::turn::ConversationTurn;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classification_id: u32,
}

/// Remote classifier speaking a minimal JSON protocol.
///
/// Does not derive Debug so the API key cannot end up in logs.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpClassifier {
    /// Create a classifier posting to `endpoint`.
    ///
    /// `timeout` bounds each request; `None` waits indefinitely.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClassifierError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    /// Build from configuration. Returns `None` when no endpoint is set.
    ///
    /// `timeout_secs = 0` disables the request timeout.
    pub fn from_config(config: &ClassifierConfig) -> Result<Option<Self>, ClassifierError> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        config
            .endpoint
            .as_deref()
            .map(|endpoint| Self::new(endpoint, timeout))
            .transpose()
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Classifier for HttpClassifier {
    async fn classify(&self, turn: &ConversationTurn) -> Result<ClassificationId, ClassifierError> {
        let mut request = self.client.post(&self.endpoint).json(&ClassifyRequest {
            content: &turn.content,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: ClassifyResponse = response.json().await.map_err(|e| {
            ClassifierError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        tracing::debug!(
            turn_id = %turn.turn_id,
            classification_id = body.classification_id,
            "Remote classifier labeled turn"
        );
        Ok(ClassificationId(body.classification_id))
    }

    fn name(&self) -> &str {
        "http"
    }
}
