//! Conversation turn and finalized record types.
//!
//! A [`ConversationTurn`] is one message in a conversation, authored by the
//! user or the assistant. Assistant turns may reference the user turn they
//! reply to through `paired_turn_id`; that reference drives label
//! derivation in the classification pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::classification::{ClassificationId, SentenceClassification};
use crate::error::InvalidTurnError;
use crate::pairing::PairingState;

/// Caller-assigned identifier of a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub String);

impl TurnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TurnId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TurnId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// One message in a conversation.
///
/// `classification_id` stays `None` until the pipeline assigns it.
/// `content` and `embedding` are opaque to the pipeline; they are consumed
/// by the classifier and the similarity search respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: TurnId,
    pub role: TurnRole,
    /// The user turn this assistant turn replies to (assistant turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_turn_id: Option<TurnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_id: Option<ClassificationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// A user turn with no label yet.
    pub fn user(turn_id: impl Into<TurnId>, content: impl Into<String>) -> Self {
        Self {
            turn_id: turn_id.into(),
            role: TurnRole::User,
            paired_turn_id: None,
            classification_id: None,
            session_id: None,
            user_id: None,
            content: content.into(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    /// An assistant turn replying to `paired_turn_id`, if known.
    pub fn assistant(
        turn_id: impl Into<TurnId>,
        paired_turn_id: Option<TurnId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            turn_id: turn_id.into(),
            role: TurnRole::Assistant,
            paired_turn_id,
            classification_id: None,
            session_id: None,
            user_id: None,
            content: content.into(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Reject turns whose shape cannot be processed.
    pub fn validate(&self) -> Result<(), InvalidTurnError> {
        if self.turn_id.as_str().trim().is_empty() {
            return Err(InvalidTurnError::EmptyTurnId);
        }

        match (self.role, &self.paired_turn_id) {
            (TurnRole::User, Some(paired)) => Err(InvalidTurnError::UserTurnWithPairing {
                turn_id: self.turn_id.clone(),
                paired_turn_id: paired.clone(),
            }),
            (TurnRole::Assistant, Some(paired)) if paired.as_str().trim().is_empty() => {
                Err(InvalidTurnError::EmptyPairedTurnId(self.turn_id.clone()))
            }
            (TurnRole::Assistant, Some(paired)) if *paired == self.turn_id => {
                Err(InvalidTurnError::SelfPairing(self.turn_id.clone()))
            }
            _ => Ok(()),
        }?;

        if let Some(index) = self.embedding.as_deref().and_then(first_non_finite) {
            return Err(InvalidTurnError::NonFiniteEmbedding {
                turn_id: self.turn_id.clone(),
                index,
            });
        }
        Ok(())
    }
}

/// Index of the first NaN or infinite component, if any.
///
/// JSON numbers beyond the f32 range parse as infinity.
pub fn first_non_finite(embedding: &[f32]) -> Option<usize> {
    embedding.iter().position(|x| !x.is_finite())
}

/// A turn after the pipeline has assigned (or failed to derive) its label.
///
/// This is what gets forwarded to the persistence gateway and returned to
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedTurn {
    pub turn: ConversationTurn,
    /// Human-readable label for `turn.classification_id`, when it maps to one.
    pub classification: Option<SentenceClassification>,
    /// How this turn relates to its pair at finalization time.
    pub pairing: PairingState,
}

impl FinalizedTurn {
    /// Finalize `turn` with the given label, looking up its human name.
    pub fn new(
        mut turn: ConversationTurn,
        classification_id: Option<ClassificationId>,
        pairing: PairingState,
    ) -> Self {
        turn.classification_id = classification_id;
        Self {
            classification: classification_id.and_then(ClassificationId::label),
            turn,
            pairing,
        }
    }

    pub fn turn_id(&self) -> &TurnId {
        &self.turn.turn_id
    }

    pub fn classification_id(&self) -> Option<ClassificationId> {
        self.turn.classification_id
    }
}
