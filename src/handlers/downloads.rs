use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::handlers::authorize;
use crate::models::api::{
    ApiKeyQuery, DownloadResponse, SuccessResponse, TorrentDeleteQuery, TorrentListResponse,
    TorrentResponse,
};
use crate::models::download::TrackedDownload;
use crate::models::history::{OutcomeEvent, OutcomeRecord};
use crate::monitor::files::spawn_skip_extras;
use crate::monitor::gateway_call;
use crate::utils::time::current_timestamp;
use crate::validation::params::{validate_info_hash, DownloadParams};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info};

/// Submit a locator to the download client and start tracking it
///
/// POST /api/download
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
    Json(params): Json<DownloadParams>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "download")?;

    let download = params.validate()?;

    if state.blacklist.contains(&download.info_hash) {
        return Err(ApiError::Conflict(format!(
            "{} is blacklisted",
            download.info_hash
        )));
    }
    if state.registry.contains(&download.info_hash) {
        return Err(ApiError::Conflict(format!(
            "{} is already tracked",
            download.info_hash
        )));
    }

    let info_hash = gateway_call(
        state.monitoring.gateway_timeout,
        state.gateway.submit(&download.locator, &download.source),
    )
    .await?;

    let now = current_timestamp();
    let tracked = TrackedDownload::new(
        info_hash.clone(),
        download.name.clone(),
        download.source.clone(),
        download.size,
        now,
    )
    .with_locator(download.locator)
    .with_quality(download.quality);

    state.registry.track(tracked)?;
    spawn_skip_extras(Arc::clone(&state.gateway), Arc::clone(&state.monitoring), info_hash.clone());

    let record = OutcomeRecord::new(&info_hash, &download.name, &download.source, OutcomeEvent::Added, now);
    if let Err(e) = state.history.record(record) {
        error!(info_hash = %info_hash, error = %e, "Failed to record outcome");
    }

    info!(info_hash = %info_hash, name = %download.name, source = %download.source, "Download submitted");

    Ok((
        StatusCode::OK,
        Json(DownloadResponse {
            success: true,
            info_hash,
            message: "Torrent added successfully".to_string(),
        }),
    )
        .into_response())
}

/// GET /api/torrents
pub async fn list_torrents_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "list torrents")?;

    let torrents = state.registry.list();

    Ok((
        StatusCode::OK,
        Json(TorrentListResponse {
            success: true,
            count: torrents.len(),
            torrents,
        }),
    )
        .into_response())
}

/// GET /api/torrent/{hash}
pub async fn get_torrent_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "get torrent")?;

    let info_hash = validate_info_hash(&hash)?;
    let torrent = state
        .registry
        .get(&info_hash)
        .ok_or_else(|| ApiError::NotFound(format!("torrent {}", info_hash)))?;

    Ok((
        StatusCode::OK,
        Json(TorrentResponse {
            success: true,
            torrent,
        }),
    )
        .into_response())
}

/// Remove a tracked torrent from the download client and the registry
///
/// DELETE /api/torrent/{hash}?delete_files=true
pub async fn delete_torrent_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(params): Query<TorrentDeleteQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &params.api_key, "delete torrent")?;

    let info_hash = validate_info_hash(&hash)?;
    let tracked = state
        .registry
        .get(&info_hash)
        .ok_or_else(|| ApiError::NotFound(format!("torrent {}", info_hash)))?;

    gateway_call(
        state.monitoring.gateway_timeout,
        state.gateway.remove(&info_hash, params.delete_files),
    )
    .await?;

    state.registry.remove(&info_hash);

    let record = OutcomeRecord::new(
        &info_hash,
        &tracked.name,
        &tracked.source,
        OutcomeEvent::Removed,
        current_timestamp(),
    );
    if let Err(e) = state.history.record(record) {
        error!(info_hash = %info_hash, error = %e, "Failed to record outcome");
    }

    info!(info_hash = %info_hash, delete_files = params.delete_files, "Torrent removed");

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: "Torrent deleted successfully".to_string(),
        }),
    )
        .into_response())
}
