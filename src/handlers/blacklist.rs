use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::handlers::authorize;
use crate::models::api::{ApiKeyQuery, BlacklistResponse, SuccessResponse};
use crate::validation::params::validate_info_hash;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

/// List blacklisted identifiers in insertion order
///
/// GET /api/blacklist
pub async fn blacklist_list_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "list blacklist")?;

    let blacklist = state.blacklist.all();

    Ok((
        StatusCode::OK,
        Json(BlacklistResponse {
            success: true,
            count: blacklist.len(),
            blacklist,
        }),
    )
        .into_response())
}

/// Administrative removal from the blacklist
///
/// DELETE /api/blacklist/{hash}
pub async fn blacklist_remove_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "remove from blacklist")?;

    let info_hash = validate_info_hash(&hash)?;

    let removed = state
        .blacklist
        .remove(&info_hash)
        .map_err(|e| ApiError::InternalError(format!("{:#}", e)))?;

    if !removed {
        return Err(ApiError::NotFound(format!("{} is not blacklisted", info_hash)));
    }

    info!(info_hash = %info_hash, "Blacklist entry removed via API");

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: "Removed from blacklist".to_string(),
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::blacklist::BlacklistReason;
    use crate::test_support::{body_json, create_test_state};
    use crate::wal::wal::WalOperation;

    fn key() -> Query<ApiKeyQuery> {
        Query(ApiKeyQuery {
            api_key: "test_api_key".to_string(),
        })
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let (state, _gateway, _dir) = create_test_state(Vec::new());
        state.blacklist.add(&"b".repeat(40), "B", BlacklistReason::Stalled).unwrap();
        state.blacklist.add(&"a".repeat(40), "A", BlacklistReason::Failed).unwrap();

        let response = blacklist_list_handler(State(state), key()).await.unwrap();
        let body: BlacklistResponse = body_json(response).await;

        assert_eq!(body.count, 2);
        assert_eq!(body.blacklist[0].info_hash, "b".repeat(40));
        assert_eq!(body.blacklist[1].reason, BlacklistReason::Failed);
    }

    #[tokio::test]
    async fn test_remove_is_journaled() {
        let (state, _gateway, _dir) = create_test_state(Vec::new());
        state.blacklist.add(&"a".repeat(40), "A", BlacklistReason::Stalled).unwrap();

        let response = blacklist_remove_handler(
            State(Arc::clone(&state)),
            Path("A".repeat(40)),
            key(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.blacklist.is_empty());

        let operations = state.wal.replay().unwrap();
        assert!(matches!(operations.last(), Some(WalOperation::Unblacklist { .. })));
    }

    #[tokio::test]
    async fn test_remove_unknown_is_not_found() {
        let (state, _gateway, _dir) = create_test_state(Vec::new());

        let response = blacklist_remove_handler(State(state), Path("a".repeat(40)), key())
            .await
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_remove_bad_hash_is_bad_request() {
        let (state, _gateway, _dir) = create_test_state(Vec::new());

        let response = blacklist_remove_handler(State(state), Path("xyz".to_string()), key())
            .await
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
