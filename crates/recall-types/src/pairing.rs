//! Per-turn pairing lifecycle.
//!
//! A user turn moves through
//! `Unclassified -> Cached -> {Paired | Abandoned}`. `Paired` and
//! `Abandoned` are terminal. Assistant records additionally finalize as
//! `Unpaired` (no reference to a user turn) or `Missed` (the referenced
//! user turn was not cached, already consumed, or expired).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::ClassificationId;
use crate::error::TransitionError;
use crate::turn::TurnId;

/// Lifecycle state of a turn with respect to pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PairingState {
    /// User turn not yet classified.
    Unclassified,
    /// User turn classified and waiting in the correlation cache for its reply.
    Cached {
        classification_id: ClassificationId,
        cached_at: DateTime<Utc>,
    },
    /// User turn consumed by its reply.
    Paired {
        classification_id: ClassificationId,
        reply_turn_id: TurnId,
    },
    /// User turn evicted without ever being paired.
    Abandoned {
        classification_id: ClassificationId,
        cached_at: DateTime<Utc>,
    },
    /// Assistant turn that does not reference any user turn.
    Unpaired,
    /// Assistant turn whose user turn was not available for pairing.
    Missed { user_turn_id: TurnId },
}

impl PairingState {
    /// Short name used in logs and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            PairingState::Unclassified => "unclassified",
            PairingState::Cached { .. } => "cached",
            PairingState::Paired { .. } => "paired",
            PairingState::Abandoned { .. } => "abandoned",
            PairingState::Unpaired => "unpaired",
            PairingState::Missed { .. } => "missed",
        }
    }

    /// `Unclassified -> Cached`.
    pub fn classify(
        self,
        classification_id: ClassificationId,
        cached_at: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        match self {
            PairingState::Unclassified => Ok(PairingState::Cached {
                classification_id,
                cached_at,
            }),
            other => Err(TransitionError::new(other.name(), "classify")),
        }
    }

    /// `Cached -> Paired`.
    pub fn pair(self, reply_turn_id: TurnId) -> Result<Self, TransitionError> {
        match self {
            PairingState::Cached {
                classification_id, ..
            } => Ok(PairingState::Paired {
                classification_id,
                reply_turn_id,
            }),
            other => Err(TransitionError::new(other.name(), "pair")),
        }
    }

    /// `Cached -> Abandoned`.
    pub fn abandon(self) -> Result<Self, TransitionError> {
        match self {
            PairingState::Cached {
                classification_id,
                cached_at,
            } => Ok(PairingState::Abandoned {
                classification_id,
                cached_at,
            }),
            other => Err(TransitionError::new(other.name(), "abandon")),
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PairingState::Unclassified | PairingState::Cached { .. })
    }

    /// The user turn's label, for states that carry one.
    pub fn classification_id(&self) -> Option<ClassificationId> {
        match self {
            PairingState::Cached {
                classification_id, ..
            }
            | PairingState::Paired {
                classification_id, ..
            }
            | PairingState::Abandoned {
                classification_id, ..
            } => Some(*classification_id),
            _ => None,
        }
    }

    /// Label derived for the reply of a `Paired` user turn.
    pub fn derived_reply_classification(&self) -> Option<ClassificationId> {
        match self {
            PairingState::Paired {
                classification_id, ..
            } => classification_id.assistant_counterpart(),
            _ => None,
        }
    }
}
