use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::handlers::authorize;
use crate::models::api::{ApiKeyQuery, SearchResponse};
use crate::validation::params::SearchParams;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

/// Search every enabled source and return merged, ranked candidates
///
/// POST /api/search
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
    Json(params): Json<SearchParams>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "search")?;

    let request = params.validate(&state.aggregator.source_names())?;
    let results = state.aggregator.search(&request).await;

    info!(
        query = %request.query,
        quality = ?request.quality,
        results = results.len(),
        "Search served"
    );

    Ok((
        StatusCode::OK,
        Json(SearchResponse {
            success: true,
            count: results.len(),
            results,
        }),
    )
        .into_response())
}
