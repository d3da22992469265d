//! Resubmission of finalized turns.
//!
//! POST /api/v1/records                   - Persist a finalized turn as-is.
//!
//! A `PERSISTENCE_FAILED` error carries the finalized record in
//! `errors[0].details`. Posting that object here stores it without
//! classifying again or touching the correlation cache.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::Instrument;

use recall_observe::spans::SPAN_PERSIST_RECORD;
use recall_types::error::PipelineError;
use recall_types::turn::FinalizedTurn;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/records - Persist a previously finalized turn.
pub async fn persist_record(
    State(state): State<AppState>,
    Json(record): Json<FinalizedTurn>,
) -> Result<(StatusCode, Json<ApiResponse<FinalizedTurn>>), AppError> {
    let start = Instant::now();
    record.turn.validate().map_err(PipelineError::InvalidTurn)?;

    // Re-derive the label name from the stored id.
    let FinalizedTurn { turn, pairing, .. } = record;
    let classification_id = turn.classification_id;
    let record = FinalizedTurn::new(turn, classification_id, pairing);

    let span = tracing::info_span!(SPAN_PERSIST_RECORD, turn_id = %record.turn_id());
    let record = state.pipeline.persist(record).instrument(span).await?;

    let href = format!("/api/v1/turns/{}", record.turn_id());
    let resp = ApiResponse::timed(record, start).with_link("self", &href);
    Ok((StatusCode::CREATED, Json(resp)))
}
