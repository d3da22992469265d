//! Correlation cache inspection endpoints.
//!
//! GET  /api/v1/cache       - Pending user turns and the eviction policy.
//! POST /api/v1/cache/sweep - Abandon expired entries now.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use recall_observe::spans::SPAN_SWEEP;
use recall_types::pairing::PairingState;
use recall_types::turn::TurnId;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Snapshot of the correlation cache.
#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub pending: usize,
    /// `None` when entries never expire.
    pub ttl_secs: Option<u64>,
    /// `None` when the cache is unbounded.
    pub max_entries: Option<usize>,
}

/// One entry removed by a sweep.
#[derive(Debug, Serialize)]
pub struct AbandonedTurn {
    pub turn_id: TurnId,
    pub pairing: PairingState,
}

/// GET /api/v1/cache - Correlation cache status.
pub async fn get_cache(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CacheStatus>>, AppError> {
    let start = Instant::now();
    let policy = state.cache.policy();

    let status = CacheStatus {
        pending: state.cache.len(),
        ttl_secs: policy.ttl.map(|ttl| ttl.as_secs()),
        max_entries: policy.max_entries,
    };

    Ok(Json(
        ApiResponse::timed(status, start).with_link("sweep", "/api/v1/cache/sweep"),
    ))
}

/// POST /api/v1/cache/sweep - Remove every expired entry.
pub async fn sweep_cache(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AbandonedTurn>>>, AppError> {
    let start = Instant::now();
    let abandoned: Vec<AbandonedTurn> = tracing::info_span!(SPAN_SWEEP).in_scope(|| {
        let swept = state.cache.sweep_expired();
        tracing::info!(count = swept.len(), "Manual cache sweep");
        swept
            .into_iter()
            .map(|(turn_id, pairing)| AbandonedTurn { turn_id, pairing })
            .collect()
    });

    Ok(Json(ApiResponse::timed(abandoned, start)))
}
