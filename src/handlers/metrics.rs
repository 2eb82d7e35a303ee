// Metrics endpoint

use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::handlers::authorize;
use crate::models::api::ApiKeyQuery;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Counters for cycles, stalls, replacements and searches, plus registry
/// and blacklist sizes and uptime.
pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &params.api_key, "metrics")?;

    let snapshot = state.metrics.get_snapshot(&state.registry, &state.blacklist);

    Ok((StatusCode::OK, Json(snapshot)).into_response())
}
