use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::handlers::authorize;
use crate::models::api::{HistoryQuery, HistoryResponse};
use crate::validation::params::validate_info_hash;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 100;

/// Outcome history, newest first, or the full trail of one identifier
///
/// GET /api/history?limit=50 or GET /api/history?info_hash=...
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &params.api_key, "history")?;

    let records = match params.info_hash.as_deref() {
        Some(raw) => state.history.for_identifier(&validate_info_hash(raw)?),
        None => state.history.recent(params.limit.unwrap_or(DEFAULT_LIMIT)),
    };

    Ok((
        StatusCode::OK,
        Json(HistoryResponse {
            success: true,
            count: records.len(),
            records,
        }),
    )
        .into_response())
}
