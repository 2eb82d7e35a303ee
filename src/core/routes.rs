// HTTP routes configuration

use crate::core::state::AppState;
use crate::handlers::{blacklist, downloads, fallback, health, history, metrics, monitoring, search};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints
        .route("/health", get(health::health_handler))

        // Everything below requires the API key
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/search", post(search::search_handler))
        .route("/api/download", post(downloads::download_handler))
        .route("/api/torrents", get(downloads::list_torrents_handler))
        .route(
            "/api/torrent/{hash}",
            get(downloads::get_torrent_handler).delete(downloads::delete_torrent_handler),
        )

        .route("/api/monitoring/start", post(monitoring::start_handler))
        .route("/api/monitoring/stop", post(monitoring::stop_handler))
        .route("/api/monitoring/run", post(monitoring::run_handler))
        .route("/api/monitoring/status", get(monitoring::status_handler))

        .route("/api/blacklist", get(blacklist::blacklist_list_handler))
        .route("/api/blacklist/{hash}", delete(blacklist::blacklist_remove_handler))
        .route("/api/history", get(history::history_handler))

        .fallback(fallback::fallback_handler)

        .with_state(state)
}
