//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/` except `/health`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Turns
        .route("/turns", post(handlers::turn::process_turn))
        .route("/turns/{turn_id}", get(handlers::turn::get_turn))
        .route(
            "/sessions/{id}/turns",
            get(handlers::turn::list_session_turns),
        )
        .route("/records", post(handlers::record::persist_record))
        // Retrieval
        .route("/search", post(handlers::search::search))
        // Correlation cache
        .route("/cache", get(handlers::cache::get_cache))
        .route("/cache/sweep", post(handlers::cache::sweep_cache));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
