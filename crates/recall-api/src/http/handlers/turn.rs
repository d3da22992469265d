//! Turn ingestion and lookup endpoints.
//!
//! POST /api/v1/turns                     - Classify, pair and persist a turn.
//! GET  /api/v1/turns/{turn_id}           - Latest stored copy of a turn.
//! GET  /api/v1/sessions/{id}/turns       - Turns of a session, oldest first.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use recall_core::persistence::TurnRepository;
use recall_observe::spans::SPAN_PROCESS_TURN;
use recall_types::turn::{ConversationTurn, FinalizedTurn, TurnId};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for session listings.
#[derive(Debug, Deserialize)]
pub struct ListTurnsQuery {
    pub limit: Option<i64>,
}

/// POST /api/v1/turns - Run one turn through the classification pipeline.
pub async fn process_turn(
    State(state): State<AppState>,
    Json(turn): Json<ConversationTurn>,
) -> Result<(StatusCode, Json<ApiResponse<FinalizedTurn>>), AppError> {
    let start = Instant::now();
    let span = tracing::info_span!(SPAN_PROCESS_TURN, turn_id = %turn.turn_id, role = %turn.role);

    let record = state.pipeline.process(turn).instrument(span).await?;

    let href = format!("/api/v1/turns/{}", record.turn_id());
    let resp = ApiResponse::timed(record, start).with_link("self", &href);
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/turns/{turn_id} - Fetch a stored turn.
pub async fn get_turn(
    State(state): State<AppState>,
    Path(turn_id): Path<String>,
) -> Result<Json<ApiResponse<ConversationTurn>>, AppError> {
    let start = Instant::now();
    let turn_id = TurnId::from(turn_id);

    let turn = state
        .pipeline
        .repository()
        .get_turn(&turn_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Turn '{turn_id}' not found")))?;

    Ok(Json(ApiResponse::timed(turn, start)))
}

/// GET /api/v1/sessions/{id}/turns - List a session's stored turns.
pub async fn list_session_turns(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ListTurnsQuery>,
) -> Result<Json<ApiResponse<Vec<ConversationTurn>>>, AppError> {
    let start = Instant::now();
    if matches!(query.limit, Some(limit) if limit <= 0) {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }

    let turns = state
        .pipeline
        .repository()
        .list_session_turns(&session_id, query.limit)
        .await?;

    Ok(Json(ApiResponse::timed(turns, start)))
}
