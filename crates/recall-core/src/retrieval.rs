//! Semantic retrieval of prior turns.
//!
//! `SimilarityRetriever` forwards a query embedding to a nearest-neighbor
//! search backend with fixed parameters and returns what the backend
//! returns. Thresholding and ordering are the backend's contract; the
//! retriever does not re-rank or re-filter.

use recall_types::error::{RepositoryError, RetrievalError};
use recall_types::retrieval::RankedTurn;
use recall_types::turn::first_non_finite;
use tracing::debug;

/// Maximum number of prior turns returned per query.
pub const MATCH_COUNT: usize = 3;

/// Minimum cosine similarity a prior turn needs to be returned.
pub const MATCH_THRESHOLD: f32 = 0.8;

/// Vector nearest-neighbor query over stored turns.
///
/// Implementations must return at most `match_count` turns, none with a
/// similarity below `match_threshold`, most similar first.
pub trait NearestNeighborSearch: Send + Sync {
    fn match_turns(
        &self,
        query_embedding: &[f32],
        match_count: usize,
        match_threshold: f32,
    ) -> impl std::future::Future<Output = Result<Vec<RankedTurn>, RepositoryError>> + Send;
}

/// Retrieves prior turns semantically similar to a query embedding.
pub struct SimilarityRetriever<S: NearestNeighborSearch> {
    search: S,
}

impl<S: NearestNeighborSearch> SimilarityRetriever<S> {
    pub fn new(search: S) -> Self {
        Self { search }
    }

    /// Access the search backend.
    pub fn backend(&self) -> &S {
        &self.search
    }

    /// Find up to [`MATCH_COUNT`] prior turns at or above [`MATCH_THRESHOLD`].
    ///
    /// `user` is accepted for per-user scoping but is not applied yet:
    /// matches may come from any user's conversations.
    pub async fn search(
        &self,
        embedding: &[f32],
        user: &str,
    ) -> Result<Vec<RankedTurn>, RetrievalError> {
        if embedding.is_empty() {
            return Err(RetrievalError::EmptyEmbedding);
        }
        if let Some(index) = first_non_finite(embedding) {
            return Err(RetrievalError::NonFiniteEmbedding { index });
        }

        let matches = self
            .search
            .match_turns(embedding, MATCH_COUNT, MATCH_THRESHOLD)
            .await?;

        debug!(
            user = %user,
            dimension = embedding.len(),
            matches = matches.len(),
            "Similarity search completed"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use recall_types::turn::ConversationTurn;

    fn ranked(id: &str, similarity: f32) -> RankedTurn {
        RankedTurn {
            turn: ConversationTurn::user(id, format!("turn {id}")),
            similarity,
        }
    }

    /// Honors the contract over a fixed pool and records the parameters it saw.
    struct PoolSearch {
        pool: Vec<RankedTurn>,
        calls: Mutex<Vec<(usize, f32)>>,
    }

    impl PoolSearch {
        fn new(pool: Vec<RankedTurn>) -> Self {
            Self {
                pool,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl NearestNeighborSearch for PoolSearch {
        async fn match_turns(
            &self,
            _query_embedding: &[f32],
            match_count: usize,
            match_threshold: f32,
        ) -> Result<Vec<RankedTurn>, RepositoryError> {
            self.calls
                .lock()
                .unwrap()
                .push((match_count, match_threshold));
            let mut hits: Vec<RankedTurn> = self
                .pool
                .iter()
                .filter(|r| r.similarity >= match_threshold)
                .cloned()
                .collect();
            hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            hits.truncate(match_count);
            Ok(hits)
        }
    }

    /// Returns a canned answer regardless of parameters.
    struct CannedSearch(Result<Vec<RankedTurn>, String>);

    impl NearestNeighborSearch for CannedSearch {
        async fn match_turns(
            &self,
            _query_embedding: &[f32],
            _match_count: usize,
            _match_threshold: f32,
        ) -> Result<Vec<RankedTurn>, RepositoryError> {
            self.0.clone().map_err(RepositoryError::Query)
        }
    }

    #[tokio::test]
    async fn search_uses_fixed_parameters() {
        let retriever = SimilarityRetriever::new(PoolSearch::new(Vec::new()));
        retriever.search(&[0.1, 0.2], "alice").await.unwrap();

        let calls = retriever.backend().calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(MATCH_COUNT, MATCH_THRESHOLD)]);
        assert_eq!(calls[0], (3, 0.8));
    }

    #[tokio::test]
    async fn search_never_exceeds_count_or_drops_below_threshold() {
        let pool = vec![
            ranked("t1", 0.95),
            ranked("t2", 0.79),
            ranked("t3", 0.81),
            ranked("t4", 0.99),
            ranked("t5", 0.5),
            ranked("t6", 0.85),
            ranked("t7", 0.8),
        ];
        let retriever = SimilarityRetriever::new(PoolSearch::new(pool));
        let matches = retriever.search(&[1.0, 0.0], "alice").await.unwrap();

        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|m| m.similarity >= MATCH_THRESHOLD));
        let ids: Vec<&str> = matches.iter().map(|m| m.turn.turn_id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t1", "t6"]);
    }

    #[tokio::test]
    async fn search_returns_backend_results_verbatim() {
        // Deliberately unordered: the retriever must not re-rank.
        let canned = vec![ranked("b", 0.81), ranked("a", 0.97)];
        let retriever = SimilarityRetriever::new(CannedSearch(Ok(canned.clone())));
        let matches = retriever.search(&[1.0], "bob").await.unwrap();
        assert_eq!(matches, canned);
    }

    #[tokio::test]
    async fn search_surfaces_backend_error() {
        let retriever = SimilarityRetriever::new(CannedSearch(Err("rpc failed".to_string())));
        let err = retriever.search(&[1.0], "bob").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Search(RepositoryError::Query(_))));
    }

    #[tokio::test]
    async fn search_rejects_empty_embedding() {
        let retriever = SimilarityRetriever::new(PoolSearch::new(vec![ranked("t1", 0.9)]));
        let err = retriever.search(&[], "alice").await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyEmbedding));
        assert!(retriever.backend().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_rejects_non_finite_embedding() {
        let retriever = SimilarityRetriever::new(PoolSearch::new(vec![ranked("t1", 0.9)]));
        let err = retriever
            .search(&[1.0, f32::INFINITY], "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::NonFiniteEmbedding { index: 1 }));

        let err = retriever.search(&[f32::NAN], "alice").await.unwrap_err();
        assert!(matches!(err, RetrievalError::NonFiniteEmbedding { index: 0 }));
        assert!(retriever.backend().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_ignores_user_for_now() {
        let retriever = SimilarityRetriever::new(PoolSearch::new(vec![ranked("t1", 0.9)]));
        let alice = retriever.search(&[1.0], "alice").await.unwrap();
        let bob = retriever.search(&[1.0], "bob").await.unwrap();
        assert_eq!(alice, bob);
    }
}
