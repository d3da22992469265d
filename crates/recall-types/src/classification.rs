//! Sentence classification label space.
//!
//! Every turn is labelled with a [`ClassificationId`] that indexes into the
//! fixed, ordered [`SentenceClassification`] enumeration. Labels come in
//! blocks of four: two user-intent labels followed by their two
//! assistant-response counterparts, so a user label plus
//! [`ASSISTANT_LABEL_OFFSET`] is the label of the reply to it.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Distance between a user-intent label and its assistant-response label
/// in the [`SentenceClassification`] enumeration.
pub const ASSISTANT_LABEL_OFFSET: u32 = 2;

/// Integer label assigned to a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationId(pub u32);

impl ClassificationId {
    /// Label of the assistant reply paired with a user turn carrying this label.
    ///
    /// Returns `None` on overflow; the reply is then left unlabeled.
    pub fn assistant_counterpart(self) -> Option<Self> {
        self.0.checked_add(ASSISTANT_LABEL_OFFSET).map(Self)
    }

    /// Look up the label this id indexes, if it is inside the label space.
    pub fn label(self) -> Option<SentenceClassification> {
        SentenceClassification::from_id(self)
    }
}

impl fmt::Display for ClassificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClassificationId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Fixed, ordered classification labels shared by user and assistant turns.
///
/// The discriminant of each variant is its [`ClassificationId`]. Do not
/// reorder: persisted records store the raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceClassification {
    UserQuestion = 0,
    UserInstruction = 1,
    AssistantAnswer = 2,
    AssistantAction = 3,
    UserFeedback = 4,
    UserSmallTalk = 5,
    AssistantAcknowledgement = 6,
    AssistantSmallTalk = 7,
}

impl SentenceClassification {
    /// All labels in id order.
    pub const ALL: [SentenceClassification; 8] = [
        SentenceClassification::UserQuestion,
        SentenceClassification::UserInstruction,
        SentenceClassification::AssistantAnswer,
        SentenceClassification::AssistantAction,
        SentenceClassification::UserFeedback,
        SentenceClassification::UserSmallTalk,
        SentenceClassification::AssistantAcknowledgement,
        SentenceClassification::AssistantSmallTalk,
    ];

    /// Pure lookup from id to label. Unknown ids yield `None`.
    pub fn from_id(id: ClassificationId) -> Option<Self> {
        Self::ALL.get(id.0 as usize).copied()
    }

    /// The id this label is stored under.
    pub fn id(self) -> ClassificationId {
        ClassificationId(self as u32)
    }

    /// Whether this label describes a user turn.
    pub fn is_user_intent(self) -> bool {
        (self as u32) % 4 < ASSISTANT_LABEL_OFFSET
    }

    /// Snake-case name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            SentenceClassification::UserQuestion => "user_question",
            SentenceClassification::UserInstruction => "user_instruction",
            SentenceClassification::AssistantAnswer => "assistant_answer",
            SentenceClassification::AssistantAction => "assistant_action",
            SentenceClassification::UserFeedback => "user_feedback",
            SentenceClassification::UserSmallTalk => "user_small_talk",
            SentenceClassification::AssistantAcknowledgement => "assistant_acknowledgement",
            SentenceClassification::AssistantSmallTalk => "assistant_small_talk",
        }
    }

    /// The assistant-response label paired with a user-intent label.
    pub fn assistant_counterpart(self) -> Option<Self> {
        if !self.is_user_intent() {
            return None;
        }
        self.id().assistant_counterpart().and_then(Self::from_id)
    }
}

impl fmt::Display for SentenceClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentenceClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == needle)
            .ok_or_else(|| format!("invalid sentence classification: '{s}'"))
    }
}
