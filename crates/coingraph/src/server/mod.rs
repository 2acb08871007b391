mod error;
mod fields;
mod limits;
mod query;
mod render;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};

use coingraph_core::Resolver;

pub use limits::QueryLimits;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub resolver: Resolver,
    pub default_limits: QueryLimits,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

pub fn build_router(state: AppState, origin: HeaderValue) -> Router {
    // Only reflect the allowed origin when the request's Origin header
    // actually matches.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &HeaderValue, _| *request_origin == origin,
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let shared = Arc::new(state);

    let api = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/limits", get(limits::get_limits))
        .route("/api/v1/query", post(query::run_query))
        .route("/api/v1/block", get(fields::get_block))
        .route(
            "/api/v1/block/{hash}/transactions",
            get(fields::get_block_transactions),
        )
        .route("/api/v1/tx/{txid}", get(fields::get_transaction))
        .route("/api/v1/tx/{txid}/block", get(fields::get_transaction_block))
        .route("/api/v1/difficulty", get(fields::get_difficulty))
        .route("/api/v1/estimatefee", get(fields::get_fee_estimate))
        .route("/api/v1/mempool", get(fields::get_mempool));

    Router::new()
        .merge(api)
        .route("/api", any(api_not_found))
        .route("/api/{*path}", any(api_not_found))
        .layer(cors)
        .with_state(shared)
}

/// Liveness plus a cheap round trip to the node.
async fn health(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, error::AppError> {
    let info = state.resolver.rpc().get_blockchain_info().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "chain": info.chain,
        "blocks": info.blocks,
    })))
}

async fn api_not_found() -> error::AppError {
    error::AppError::NotFound("API route not found".to_string())
}
