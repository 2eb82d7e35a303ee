use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::handlers::authorize;
use crate::models::api::{ApiKeyQuery, CycleResponse, MonitoringStatusResponse, SuccessResponse};
use crate::monitor::scheduler::SchedulerState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

fn success(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// POST /api/monitoring/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "start monitoring")?;

    if state.scheduler.start() {
        info!("Monitoring started via API");
        Ok(success("Monitoring started"))
    } else {
        Ok(success("Monitoring already active"))
    }
}

/// POST /api/monitoring/stop
///
/// A cycle in flight runs to completion.
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "stop monitoring")?;

    if state.scheduler.stop() {
        info!("Monitoring stopped via API");
        Ok(success("Monitoring stopped"))
    } else {
        Ok(success("Monitoring already stopped"))
    }
}

/// POST /api/monitoring/run
pub async fn run_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "run monitoring cycle")?;

    let report = state.scheduler.run_once().await;

    Ok((StatusCode::OK, Json(CycleResponse { success: true, report })).into_response())
}

/// GET /api/monitoring/status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &auth.api_key, "monitoring status")?;

    let scheduler_state = state.scheduler.state();

    Ok((
        StatusCode::OK,
        Json(MonitoringStatusResponse {
            success: true,
            state: scheduler_state,
            active: scheduler_state == SchedulerState::Running,
            tracked: state.registry.len(),
            interval_secs: state.monitoring.interval.as_secs(),
        }),
    )
        .into_response())
}
