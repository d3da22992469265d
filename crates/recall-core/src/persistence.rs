//! TurnRepository trait definition.
//!
//! The durable sink for finalized turns. The pipeline only ever calls
//! `append`; the read methods back the CLI and HTTP surfaces.

use recall_types::error::RepositoryError;
use recall_types::turn::{ConversationTurn, FinalizedTurn, TurnId};
use uuid::Uuid;

/// Repository trait for conversation turn persistence.
///
/// Implementations live in recall-infra (e.g., `SqliteTurnRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TurnRepository: Send + Sync {
    /// Durably append a finalized turn.
    fn append(
        &self,
        record: &FinalizedTurn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a stored turn by its identifier.
    fn get_turn(
        &self,
        turn_id: &TurnId,
    ) -> impl std::future::Future<Output = Result<Option<ConversationTurn>, RepositoryError>> + Send;

    /// List turns of a session, ordered by created_at ASC.
    fn list_session_turns(
        &self,
        session_id: &Uuid,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationTurn>, RepositoryError>> + Send;

    /// Count all stored turns.
    fn count_turns(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
