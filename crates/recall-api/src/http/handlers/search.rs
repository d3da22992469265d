//! Similarity search endpoint.
//!
//! POST /api/v1/search - Prior turns similar to a query embedding.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::Instrument;

use recall_observe::spans::SPAN_SEARCH;
use recall_types::retrieval::RankedTurn;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for a similarity search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub embedding: Vec<f32>,
    /// Caller identity. Accepted but not yet used to scope results.
    #[serde(default)]
    pub user: String,
}

/// POST /api/v1/search - Up to three prior turns at or above 0.8 similarity.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ApiResponse<Vec<RankedTurn>>>, AppError> {
    let start = Instant::now();
    let span = tracing::info_span!(SPAN_SEARCH, user = %request.user);

    let matches = state
        .retriever
        .search(&request.embedding, &request.user)
        .instrument(span)
        .await?;

    Ok(Json(ApiResponse::timed(matches, start)))
}
