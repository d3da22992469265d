//! Similarity retrieval result types.

use serde::{Deserialize, Serialize};

use crate::turn::ConversationTurn;

/// A prior turn returned by nearest-neighbor search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTurn {
    pub turn: ConversationTurn,
    /// Cosine similarity to the query embedding (1.0 = identical direction).
    pub similarity: f32,
}
