//! Deterministic offline classifier.
//!
//! Labels user turns from surface cues only. Used when no remote endpoint
//! is configured, so local runs and demos still produce pairable labels.

use recall_core::classify::Classifier;
use recall_types::classification::{ClassificationId, SentenceClassification};
use recall_types::error::ClassifierError;
use recall_types::turn::ConversationTurn;

const SMALL_TALK: &[&str] = &[
    "hi", "hello", "hey", "good morning", "good evening", "how are you", "bye", "goodbye",
];

const FEEDBACK: &[&str] = &[
    "thanks", "thank you", "great", "perfect", "awesome", "wrong", "not helpful", "doesn't work",
    "didn't work", "that's not",
];

const QUESTION_WORDS: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "which", "can", "could", "is", "are", "do",
    "does", "should", "would", "will",
];

/// Rule-based classifier over lowercase content.
///
/// Order matters: feedback beats small talk, both beat the question and
/// instruction fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// The label for `content`, without going through the async trait.
    pub fn label_for(content: &str) -> SentenceClassification {
        let text = content.trim().to_lowercase();
        let first_word = text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .find(|w| !w.is_empty())
            .unwrap_or("");

        if FEEDBACK.iter().any(|cue| text.contains(cue)) {
            SentenceClassification::UserFeedback
        } else if SMALL_TALK.iter().any(|cue| opens_with(&text, cue)) {
            SentenceClassification::UserSmallTalk
        } else if text.ends_with('?') || QUESTION_WORDS.contains(&first_word) {
            SentenceClassification::UserQuestion
        } else {
            SentenceClassification::UserInstruction
        }
    }
}

/// `text` is `cue` alone or `cue` followed by a word boundary.
fn opens_with(text: &str, cue: &str) -> bool {
    text.strip_prefix(cue)
        .is_some_and(|rest| rest.chars().next().is_none_or(|c| !c.is_alphanumeric()))
}

impl Classifier for KeywordClassifier {
    async fn classify(&self, turn: &ConversationTurn) -> Result<ClassificationId, ClassifierError> {
        Ok(Self::label_for(&turn.content).id())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let cases = [
            ("refund?", SentenceClassification::UserQuestion),
            ("How do I reset my password", SentenceClassification::UserQuestion),
            ("Reset my password.", SentenceClassification::UserInstruction),
            ("Thanks, that fixed it!", SentenceClassification::UserFeedback),
            ("That's not what I asked?", SentenceClassification::UserFeedback),
            ("Hello!", SentenceClassification::UserSmallTalk),
            ("hi", SentenceClassification::UserSmallTalk),
            ("history of rome", SentenceClassification::UserInstruction),
            ("", SentenceClassification::UserInstruction),
        ];
        for (content, expected) in cases {
            assert_eq!(KeywordClassifier::label_for(content), expected, "{content:?}");
        }
    }

    #[test]
    fn test_labels_are_user_intents() {
        for content in ["a?", "do x", "thanks", "hey there"] {
            assert!(KeywordClassifier::label_for(content).is_user_intent());
        }
    }

    #[tokio::test]
    async fn test_classify_trait() {
        let id = KeywordClassifier::new()
            .classify(&ConversationTurn::user("u1", "what is rust?"))
            .await
            .unwrap();
        assert_eq!(id, ClassificationId(0));
    }
}
