//! Classifier trait definition.

use recall_types::classification::ClassificationId;
use recall_types::error::ClassifierError;
use recall_types::turn::ConversationTurn;

/// Assigns a classification label to a conversation turn.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in recall-infra. Calls may be slow; the pipeline
/// awaits them without a timeout.
pub trait Classifier: Send + Sync {
    /// Classify the turn's content.
    fn classify(
        &self,
        turn: &ConversationTurn,
    ) -> impl std::future::Future<Output = Result<ClassificationId, ClassifierError>> + Send;

    /// Backend name for logs (e.g., "http", "keyword").
    fn name(&self) -> &str;
}
