//! Turn classification pipeline.
//!
//! `TurnClassificationPipeline` labels each incoming turn and forwards the
//! finalized record to the persistence gateway. User turns are labeled by
//! the classifier and parked in the [`CorrelationCache`]; an assistant turn
//! that names its user turn consumes that entry and inherits the user
//! label shifted by [`ASSISTANT_LABEL_OFFSET`].
//!
//! Classification and persistence failures come back as [`PipelineError`]
//! values. The pipeline never retries; `persist` exists so the caller can.
//!
//! [`ASSISTANT_LABEL_OFFSET`]: recall_types::classification::ASSISTANT_LABEL_OFFSET

use recall_types::error::PipelineError;
use recall_types::pairing::PairingState;
use recall_types::turn::{ConversationTurn, FinalizedTurn, TurnRole};
use tracing::{debug, error, info, warn};

use crate::classify::Classifier;
use crate::correlation::CorrelationCache;
use crate::persistence::TurnRepository;

/// Labels turns, pairs replies with their prompts and persists the result.
///
/// Generic over `Classifier` and `TurnRepository` so recall-core never
/// depends on recall-infra. The cache is injected; clones of the same
/// cache may be shared with a sweeper or other pipelines.
pub struct TurnClassificationPipeline<C: Classifier, R: TurnRepository> {
    classifier: C,
    repository: R,
    cache: CorrelationCache,
}

impl<C: Classifier, R: TurnRepository> TurnClassificationPipeline<C, R> {
    pub fn new(classifier: C, repository: R, cache: CorrelationCache) -> Self {
        Self {
            classifier,
            repository,
            cache,
        }
    }

    /// Access the correlation cache.
    pub fn cache(&self) -> &CorrelationCache {
        &self.cache
    }

    /// Access the classifier.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Access the persistence gateway.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Label, pair and persist a single turn.
    ///
    /// A pairing miss is not an error: the assistant turn is persisted
    /// without a label and its record carries `PairingState::Missed`.
    pub async fn process(&self, turn: ConversationTurn) -> Result<FinalizedTurn, PipelineError> {
        if let Err(err) = turn.validate() {
            error!(
                turn_id = %turn.turn_id,
                role = %turn.role,
                error = %err,
                "Rejected invalid turn"
            );
            return Err(err.into());
        }

        let record = match turn.role {
            TurnRole::User => self.finalize_user_turn(turn).await?,
            TurnRole::Assistant => self.finalize_assistant_turn(turn),
        };

        info!(
            turn_id = %record.turn_id(),
            role = %record.turn.role,
            classification_id = record.classification_id().map(|id| id.0),
            label = record.classification.map(|c| c.as_str()),
            pairing = record.pairing.name(),
            "Processed turn"
        );

        self.persist(record).await
    }

    /// Forward a finalized record to the persistence gateway.
    ///
    /// This is also the retry path after `PipelineError::PersistenceFailed`:
    /// the error carries the record to resubmit. It does not touch the cache.
    pub async fn persist(&self, record: FinalizedTurn) -> Result<FinalizedTurn, PipelineError> {
        match self.repository.append(&record).await {
            Ok(()) => Ok(record),
            Err(source) => {
                warn!(
                    turn_id = %record.turn_id(),
                    error = %source,
                    "Failed to persist finalized turn"
                );
                Err(PipelineError::PersistenceFailed {
                    record: Box::new(record),
                    source,
                })
            }
        }
    }

    async fn finalize_user_turn(
        &self,
        turn: ConversationTurn,
    ) -> Result<FinalizedTurn, PipelineError> {
        let classification_id = match self.classifier.classify(&turn).await {
            Ok(id) => id,
            Err(source) => {
                warn!(
                    turn_id = %turn.turn_id,
                    classifier = self.classifier.name(),
                    error = %source,
                    "Classification failed"
                );
                return Err(PipelineError::ClassificationFailed {
                    turn_id: turn.turn_id,
                    source,
                });
            }
        };

        let pairing = self.cache.put(turn.turn_id.clone(), classification_id);
        Ok(FinalizedTurn::new(turn, Some(classification_id), pairing))
    }

    fn finalize_assistant_turn(&self, turn: ConversationTurn) -> FinalizedTurn {
        let Some(user_turn_id) = turn.paired_turn_id.clone() else {
            return FinalizedTurn::new(turn, None, PairingState::Unpaired);
        };

        match self.cache.take(&user_turn_id, &turn.turn_id) {
            Some(paired) => {
                let derived = paired.derived_reply_classification();
                if derived.is_none() {
                    warn!(
                        turn_id = %turn.turn_id,
                        user_turn_id = %user_turn_id,
                        "User label has no assistant counterpart, leaving reply unlabeled"
                    );
                }
                FinalizedTurn::new(turn, derived, paired)
            }
            None => {
                debug!(
                    turn_id = %turn.turn_id,
                    user_turn_id = %user_turn_id,
                    "No cached user turn to pair with"
                );
                FinalizedTurn::new(turn, None, PairingState::Missed { user_turn_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use recall_types::classification::{ClassificationId, SentenceClassification};
    use recall_types::error::{ClassifierError, RepositoryError};
    use recall_types::turn::TurnId;
    use uuid::Uuid;

    use crate::correlation::EvictionPolicy;

    struct FakeClassifier {
        label: Option<u32>,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn returning(label: u32) -> Self {
            Self {
                label: Some(label),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                label: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FakeClassifier {
        async fn classify(
            &self,
            _turn: &ConversationTurn,
        ) -> Result<ClassificationId, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.label
                .map(ClassificationId)
                .ok_or_else(|| ClassifierError::Unavailable("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    #[derive(Default)]
    struct InMemoryRepository {
        records: Mutex<Vec<FinalizedTurn>>,
        fail: AtomicBool,
    }

    impl InMemoryRepository {
        fn stored(&self) -> Vec<FinalizedTurn> {
            self.records.lock().unwrap().clone()
        }
    }

    impl TurnRepository for InMemoryRepository {
        async fn append(&self, record: &FinalizedTurn) -> Result<(), RepositoryError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RepositoryError::Connection);
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get_turn(
            &self,
            turn_id: &TurnId,
        ) -> Result<Option<ConversationTurn>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.turn_id() == turn_id)
                .map(|r| r.turn.clone()))
        }

        async fn list_session_turns(
            &self,
            session_id: &Uuid,
            _limit: Option<i64>,
        ) -> Result<Vec<ConversationTurn>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.turn.session_id.as_ref() == Some(session_id))
                .map(|r| r.turn.clone())
                .collect())
        }

        async fn count_turns(&self) -> Result<u64, RepositoryError> {
            Ok(self.records.lock().unwrap().len() as u64)
        }
    }

    fn pipeline(label: u32) -> TurnClassificationPipeline<FakeClassifier, InMemoryRepository> {
        TurnClassificationPipeline::new(
            FakeClassifier::returning(label),
            InMemoryRepository::default(),
            CorrelationCache::default(),
        )
    }

    fn reply(id: &str, to: &str) -> ConversationTurn {
        ConversationTurn::assistant(id, Some(TurnId::from(to)), "Sure, let me help.")
    }

    #[tokio::test]
    async fn test_user_turn_is_classified_cached_and_persisted() {
        let pipeline = pipeline(4);
        let record = pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap();

        assert_eq!(record.classification_id(), Some(ClassificationId(4)));
        assert_eq!(record.classification, Some(SentenceClassification::UserFeedback));
        assert_eq!(record.pairing.name(), "cached");

        let u1 = TurnId::from("u1");
        assert!(pipeline.cache().contains(&u1));
        assert_eq!(
            pipeline.cache().peek(&u1).and_then(|s| s.classification_id()),
            Some(ClassificationId(4))
        );
        assert_eq!(pipeline.repository().stored(), vec![record]);
    }

    #[tokio::test]
    async fn test_reply_inherits_offset_label_and_consumes_entry() {
        let pipeline = pipeline(4);
        pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap();

        let record = pipeline.process(reply("a1", "u1")).await.unwrap();

        assert_eq!(record.classification_id(), Some(ClassificationId(6)));
        assert_eq!(
            record.classification,
            Some(SentenceClassification::AssistantAcknowledgement)
        );
        assert_eq!(
            record.pairing,
            PairingState::Paired {
                classification_id: ClassificationId(4),
                reply_turn_id: TurnId::from("a1"),
            }
        );
        assert!(pipeline.cache().is_empty());
        assert_eq!(pipeline.repository().stored().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_never_calls_classifier() {
        let pipeline = pipeline(0);
        pipeline
            .process(ConversationTurn::user("u1", "what is rust?"))
            .await
            .unwrap();
        pipeline.process(reply("a1", "u1")).await.unwrap();
        pipeline
            .process(ConversationTurn::assistant("a2", None, "hello"))
            .await
            .unwrap();
        assert_eq!(pipeline.classifier().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pairing_holds_for_every_user_label() {
        for label in SentenceClassification::ALL
            .iter()
            .filter(|c| c.is_user_intent())
            .map(|c| c.id())
        {
            let pipeline = pipeline(label.0);
            pipeline
                .process(ConversationTurn::user("u1", "hi"))
                .await
                .unwrap();
            let record = pipeline.process(reply("a1", "u1")).await.unwrap();
            assert_eq!(record.classification_id(), Some(ClassificationId(label.0 + 2)));
        }
    }

    #[tokio::test]
    async fn test_duplicate_delivery_leaves_second_reply_unlabeled() {
        let pipeline = pipeline(4);
        pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap();

        let first = pipeline.process(reply("a1", "u1")).await.unwrap();
        let second = pipeline.process(reply("a1", "u1")).await.unwrap();

        assert_eq!(first.classification_id(), Some(ClassificationId(6)));
        assert_eq!(second.classification_id(), None);
        assert_eq!(
            second.pairing,
            PairingState::Missed {
                user_turn_id: TurnId::from("u1")
            }
        );
        assert_eq!(pipeline.repository().stored().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replies_pair_at_most_once() {
        for round in 0..20 {
            let pipeline = Arc::new(pipeline(1));
            let user_turn = format!("u{round}");
            pipeline
                .process(ConversationTurn::user(user_turn.as_str(), "do it"))
                .await
                .unwrap();

            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let pipeline = Arc::clone(&pipeline);
                    let turn = reply(&format!("a{round}-{i}"), &user_turn);
                    tokio::spawn(async move { pipeline.process(turn).await })
                })
                .collect();

            let mut labeled = 0;
            for handle in handles {
                let record = handle.await.unwrap().unwrap();
                if let Some(id) = record.classification_id() {
                    assert_eq!(id, ClassificationId(3));
                    labeled += 1;
                }
            }
            assert_eq!(labeled, 1, "round {round}");
        }
    }

    #[tokio::test]
    async fn test_reply_to_unknown_turn_is_missed_not_error() {
        let pipeline = pipeline(4);
        let record = pipeline.process(reply("a1", "ghost")).await.unwrap();
        assert_eq!(record.classification_id(), None);
        assert_eq!(record.classification, None);
        assert_eq!(record.pairing.name(), "missed");
        assert_eq!(pipeline.repository().stored().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_without_pairing_is_unpaired() {
        let pipeline = pipeline(4);
        pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap();
        let record = pipeline
            .process(ConversationTurn::assistant("a1", None, "Welcome back!"))
            .await
            .unwrap();

        assert_eq!(record.classification_id(), None);
        assert_eq!(record.pairing, PairingState::Unpaired);
        assert!(pipeline.cache().contains(&TurnId::from("u1")));
    }

    #[tokio::test]
    async fn test_classification_failure_caches_and_persists_nothing() {
        let pipeline = TurnClassificationPipeline::new(
            FakeClassifier::failing(),
            InMemoryRepository::default(),
            CorrelationCache::default(),
        );
        let err = pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ClassificationFailed { ref turn_id, .. } if turn_id.as_str() == "u1"
        ));
        assert!(err.partial_record().is_none());
        assert!(pipeline.cache().is_empty());
        assert!(pipeline.repository().stored().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_returns_partial_record_for_retry() {
        let pipeline = pipeline(4);
        pipeline.repository().fail.store(true, Ordering::SeqCst);

        let err = pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap_err();
        let PipelineError::PersistenceFailed { record, source } = err else {
            panic!("expected persistence failure");
        };
        assert!(matches!(source, RepositoryError::Connection));
        assert_eq!(record.classification_id(), Some(ClassificationId(4)));
        // Classification already happened, so the reply can still pair.
        assert!(pipeline.cache().contains(&TurnId::from("u1")));
        assert!(pipeline.repository().stored().is_empty());

        pipeline.repository().fail.store(false, Ordering::SeqCst);
        let retried = pipeline.persist(*record).await.unwrap();
        assert_eq!(pipeline.repository().stored(), vec![retried]);
        assert_eq!(pipeline.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_turn_is_rejected_before_any_side_effect() {
        let pipeline = pipeline(4);
        let mut turn = ConversationTurn::user("u1", "refund?");
        turn.paired_turn_id = Some(TurnId::from("u0"));

        let err = pipeline.process(turn).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTurn(_)));

        let err = pipeline.process(reply("a1", "a1")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTurn(_)));

        assert_eq!(pipeline.classifier().calls.load(Ordering::SeqCst), 0);
        assert!(pipeline.cache().is_empty());
        assert!(pipeline.repository().stored().is_empty());
    }

    #[tokio::test]
    async fn test_expired_user_turn_is_a_pairing_miss() {
        let cache = CorrelationCache::new(EvictionPolicy {
            ttl: Some(Duration::from_millis(1)),
            max_entries: None,
        });
        let pipeline = TurnClassificationPipeline::new(
            FakeClassifier::returning(4),
            InMemoryRepository::default(),
            cache,
        );
        pipeline
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let record = pipeline.process(reply("a1", "u1")).await.unwrap();
        assert_eq!(record.classification_id(), None);
        assert_eq!(record.pairing.name(), "missed");
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn test_injected_caches_are_isolated() {
        let first = pipeline(4);
        let second = pipeline(4);
        first
            .process(ConversationTurn::user("u1", "refund?"))
            .await
            .unwrap();

        let record = second.process(reply("a1", "u1")).await.unwrap();
        assert_eq!(record.classification_id(), None);
        assert!(first.cache().contains(&TurnId::from("u1")));
    }
}
