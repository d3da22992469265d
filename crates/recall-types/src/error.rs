use thiserror::Error;

use crate::turn::{FinalizedTurn, TurnId};

/// Errors returned by classifier backends.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
}

/// Errors from repository operations (used by trait definitions in recall-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from similarity search.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding is empty")]
    EmptyEmbedding,

    #[error("query embedding component {index} is not a finite number")]
    NonFiniteEmbedding { index: usize },

    #[error("nearest-neighbor search failed: {0}")]
    Search(#[from] RepositoryError),
}

/// Structurally invalid turns. These are never persisted.
#[derive(Debug, Error)]
pub enum InvalidTurnError {
    #[error("turn id is empty")]
    EmptyTurnId,

    #[error("user turn '{turn_id}' must not reference another turn (got '{paired_turn_id}')")]
    UserTurnWithPairing {
        turn_id: TurnId,
        paired_turn_id: TurnId,
    },

    #[error("assistant turn '{0}' has an empty paired turn id")]
    EmptyPairedTurnId(TurnId),

    #[error("assistant turn '{0}' cannot pair with itself")]
    SelfPairing(TurnId),

    #[error("turn '{turn_id}' has a non-finite embedding component at index {index}")]
    NonFiniteEmbedding { turn_id: TurnId, index: usize },
}

/// A pairing state machine transition that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pairing transition: {action} from {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub action: &'static str,
}

impl TransitionError {
    pub fn new(from: &'static str, action: &'static str) -> Self {
        Self { from, action }
    }
}

/// Failures surfaced by the turn classification pipeline.
///
/// Expected failure modes are returned as values; the caller decides
/// whether to retry.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid turn: {0}")]
    InvalidTurn(#[from] InvalidTurnError),

    /// The classifier failed. Nothing was cached or persisted.
    #[error("classification failed for turn '{turn_id}': {source}")]
    ClassificationFailed {
        turn_id: TurnId,
        #[source]
        source: ClassifierError,
    },

    /// The record was finalized but could not be persisted.
    #[error("persistence failed for turn '{}': {source}", .record.turn.turn_id)]
    PersistenceFailed {
        record: Box<FinalizedTurn>,
        #[source]
        source: RepositoryError,
    },
}

impl PipelineError {
    /// The finalized record computed before the failure, if any.
    pub fn partial_record(&self) -> Option<&FinalizedTurn> {
        match self {
            PipelineError::PersistenceFailed { record, .. } => Some(record),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassificationId;
    use crate::pairing::PairingState;
    use crate::turn::ConversationTurn;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_classifier_error_display() {
        let err = ClassifierError::Rejected {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_persistence_failure_keeps_partial_record() {
        let record = FinalizedTurn::new(
            ConversationTurn::user("u1", "refund?"),
            Some(ClassificationId(4)),
            PairingState::Unclassified,
        );
        let err = PipelineError::PersistenceFailed {
            record: Box::new(record),
            source: RepositoryError::Connection,
        };
        assert!(err.to_string().contains("'u1'"));
        let partial = err.partial_record().unwrap();
        assert_eq!(partial.classification_id(), Some(ClassificationId(4)));
    }

    #[test]
    fn test_classification_failure_has_no_partial_record() {
        let err = PipelineError::ClassificationFailed {
            turn_id: TurnId::from("u1"),
            source: ClassifierError::Unavailable("timeout".to_string()),
        };
        assert!(err.partial_record().is_none());
    }
}
