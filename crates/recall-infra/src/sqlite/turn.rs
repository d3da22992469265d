//! SQLite turn repository implementation.
//!
//! Implements `TurnRepository` and `NearestNeighborSearch` from
//! `recall-core` using sqlx with split read/write pools. Embeddings are
//! stored as little-endian f32 blobs, the native vector format of the
//! sqlite-vec extension, and ranked in SQL with `vec_distance_cosine`.

use chrono::{DateTime, SecondsFormat, Utc};
use recall_core::persistence::TurnRepository;
use recall_core::retrieval::NearestNeighborSearch;
use recall_types::classification::ClassificationId;
use recall_types::error::RepositoryError;
use recall_types::retrieval::RankedTurn;
use recall_types::turn::{ConversationTurn, FinalizedTurn, TurnId, TurnRole};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed persistence gateway and similarity search.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct TurnRow {
    turn_id: String,
    role: String,
    paired_turn_id: Option<String>,
    classification_id: Option<i64>,
    session_id: Option<String>,
    user_id: Option<String>,
    content: String,
    embedding: Option<Vec<u8>>,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            turn_id: row.try_get("turn_id")?,
            role: row.try_get("role")?,
            paired_turn_id: row.try_get("paired_turn_id")?,
            classification_id: row.try_get("classification_id")?,
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            embedding: row.try_get("embedding")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<ConversationTurn, RepositoryError> {
        let role: TurnRole = self.role.parse().map_err(RepositoryError::Query)?;
        let classification_id = self
            .classification_id
            .map(|id| {
                u32::try_from(id)
                    .map(ClassificationId)
                    .map_err(|e| RepositoryError::Query(format!("invalid classification_id: {e}")))
            })
            .transpose()?;
        let session_id = self
            .session_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let embedding = self
            .embedding
            .as_deref()
            .map(embedding_from_bytes)
            .transpose()?;

        Ok(ConversationTurn {
            turn_id: TurnId::from(self.turn_id),
            role,
            paired_turn_id: self.paired_turn_id.map(TurnId::from),
            classification_id,
            session_id,
            user_id: self.user_id,
            content: self.content,
            embedding,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so `ORDER BY created_at` sorts chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// sqlite-vec `float[]` blob layout: packed little-endian f32.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn embedding_from_bytes(bytes: &[u8]) -> Result<Vec<f32>, RepositoryError> {
    if bytes.len() % 4 != 0 {
        return Err(RepositoryError::Query(format!(
            "invalid embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// TurnRepository implementation
// ---------------------------------------------------------------------------

impl TurnRepository for SqliteTurnRepository {
    async fn append(&self, record: &FinalizedTurn) -> Result<(), RepositoryError> {
        let turn = &record.turn;
        // sqlite-vec rejects zero-length vectors, so an empty embedding is stored as NULL.
        let embedding = turn
            .embedding
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(embedding_to_bytes);

        sqlx::query(
            r#"INSERT INTO conversation_turns (id, turn_id, role, paired_turn_id, classification_id, pairing_state, session_id, user_id, content, embedding, created_at, stored_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(turn.turn_id.as_str())
        .bind(turn.role.to_string())
        .bind(turn.paired_turn_id.as_ref().map(TurnId::as_str))
        .bind(turn.classification_id.map(|id| i64::from(id.0)))
        .bind(record.pairing.name())
        .bind(turn.session_id.map(|id| id.to_string()))
        .bind(&turn.user_id)
        .bind(&turn.content)
        .bind(embedding)
        .bind(format_datetime(&turn.created_at))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_turn(&self, turn_id: &TurnId) -> Result<Option<ConversationTurn>, RepositoryError> {
        // Duplicate deliveries are stored separately; the latest one wins.
        let row = sqlx::query(
            "SELECT * FROM conversation_turns WHERE turn_id = ? ORDER BY stored_at DESC, id DESC LIMIT 1",
        )
        .bind(turn_id.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => {
                let turn_row = TurnRow::from_row(&row).map_err(query_error)?;
                Ok(Some(turn_row.into_turn()?))
            }
            None => Ok(None),
        }
    }

    async fn list_session_turns(
        &self,
        session_id: &Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let limit = limit.unwrap_or(-1);
        let rows = sqlx::query(
            "SELECT * FROM conversation_turns WHERE session_id = ? ORDER BY created_at ASC, id ASC LIMIT ?",
        )
        .bind(session_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                TurnRow::from_row(row)
                    .map_err(query_error)
                    .and_then(TurnRow::into_turn)
            })
            .collect()
    }

    async fn count_turns(&self) -> Result<u64, RepositoryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversation_turns")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?;
        Ok(row.0.max(0) as u64)
    }
}

// ---------------------------------------------------------------------------
// NearestNeighborSearch implementation
// ---------------------------------------------------------------------------

impl NearestNeighborSearch for SqliteTurnRepository {
    async fn match_turns(
        &self,
        query_embedding: &[f32],
        match_count: usize,
        match_threshold: f32,
    ) -> Result<Vec<RankedTurn>, RepositoryError> {
        if query_embedding.is_empty() || match_count == 0 {
            return Ok(Vec::new());
        }

        // Only blobs of exactly the query's byte length reach sqlite-vec, so
        // other dimensions and malformed values get a NULL distance instead
        // of failing the statement. Zero vectors yield NaN, which SQLite
        // also turns into NULL.
        let query_bytes = embedding_to_bytes(query_embedding);
        let query_len = query_bytes.len() as i64;
        let max_distance = 1.0 - f64::from(match_threshold);
        let rows = sqlx::query(
            r#"SELECT * FROM (
                   SELECT *,
                          CASE WHEN typeof(embedding) = 'blob' AND length(embedding) = ?2
                               THEN vec_distance_cosine(embedding, ?1)
                          END AS distance
                   FROM conversation_turns
                   WHERE embedding IS NOT NULL
               )
               WHERE distance IS NOT NULL AND distance <= ?3
               ORDER BY distance ASC, stored_at DESC
               LIMIT ?4"#,
        )
        .bind(query_bytes)
        .bind(query_len)
        .bind(max_distance)
        .bind(i64::try_from(match_count).unwrap_or(i64::MAX))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut ranked = Vec::with_capacity(rows.len());
        for row in &rows {
            let distance: f64 = row.try_get("distance").map_err(query_error)?;
            let turn = match TurnRow::from_row(row)
                .map_err(query_error)
                .and_then(TurnRow::into_turn)
            {
                Ok(turn) => turn,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable stored turn in similarity search");
                    continue;
                }
            };
            ranked.push(RankedTurn {
                turn,
                similarity: (1.0 - distance) as f32,
            });
        }
        Ok(ranked)
    }
}
