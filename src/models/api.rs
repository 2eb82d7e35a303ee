use crate::models::blacklist::BlacklistEntry;
use crate::models::download::TrackedDownload;
use crate::models::history::OutcomeRecord;
use crate::models::search::SearchResult;
use crate::monitor::scheduler::{CycleReport, SchedulerState};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ApiKeyQuery {
    pub api_key: String,
}

#[derive(Deserialize)]
pub struct TorrentDeleteQuery {
    pub api_key: String,
    #[serde(default)]
    pub delete_files: bool,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub api_key: String,
    pub limit: Option<usize>,
    pub info_hash: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub count: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub info_hash: String,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct TorrentListResponse {
    pub success: bool,
    pub count: usize,
    pub torrents: Vec<TrackedDownload>,
}

#[derive(Serialize, Deserialize)]
pub struct TorrentResponse {
    pub success: bool,
    pub torrent: TrackedDownload,
}

#[derive(Serialize, Deserialize)]
pub struct MonitoringStatusResponse {
    pub success: bool,
    pub state: SchedulerState,
    pub active: bool,
    pub tracked: usize,
    pub interval_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct CycleResponse {
    pub success: bool,
    /// `None` when another cycle was already running
    pub report: Option<CycleReport>,
}

#[derive(Serialize, Deserialize)]
pub struct BlacklistResponse {
    pub success: bool,
    pub count: usize,
    pub blacklist: Vec<BlacklistEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub records: Vec<OutcomeRecord>,
}
