use crate::models::search::Quality;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Lifecycle of a download under management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Being polled and evaluated every cycle
    Active,
    /// The client reported the payload as complete
    Completed,
    /// Given up on; kept visible for operators
    Inactive,
}

/// State reported by the download client on the last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Downloading,
    Stalled,
    FetchingMetadata,
    Queued,
    Paused,
    Checking,
    Completed,
    Error,
    MissingFiles,
    /// Not present in the client anymore
    Missing,
    Unknown,
}

impl ClientState {
    /// Unrecoverable on the client side; no amount of waiting fixes these
    pub fn is_failure(self) -> bool {
        matches!(self, ClientState::Error | ClientState::MissingFiles | ClientState::Missing)
    }

    /// States the stall detector leaves alone
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            ClientState::Paused | ClientState::Queued | ClientState::Checking | ClientState::Completed
        )
    }
}

/// Live status for one item as returned by the download gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub info_hash: String,
    pub name: String,
    /// Total payload size in bytes
    pub size: u64,
    /// Bytes downloaded so far
    pub downloaded: u64,
    /// Instantaneous download speed in bytes per second
    pub speed: u64,
    pub seeds: u32,
    pub leechers: u32,
    pub state: ClientState,
    pub content_path: Option<String>,
    /// Source tag attached at submission time, if the client kept it
    pub source: Option<String>,
}

impl LiveStatus {
    /// Placeholder status for an identifier the client no longer knows about
    pub fn missing(info_hash: &str) -> Self {
        Self {
            info_hash: info_hash.to_string(),
            name: String::new(),
            size: 0,
            downloaded: 0,
            speed: 0,
            seeds: 0,
            leechers: 0,
            state: ClientState::Missing,
            content_path: None,
            source: None,
        }
    }
}

/// One file inside a torrent's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFile {
    /// Position in the torrent; the client addresses files by it
    pub index: usize,
    pub name: String,
    pub size: u64,
    /// 0 means the file is not downloaded
    pub priority: u8,
}

/// One observation in a download's progress history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSample {
    pub timestamp: i64,
    pub downloaded: u64,
    pub speed: u64,
}

/// A physical download under management
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedDownload {
    /// Lowercase 40 character hex info hash
    pub info_hash: String,
    pub name: String,
    /// Name of the source the locator came from
    pub source: String,
    pub locator: Option<String>,
    /// Total payload size in bytes (0 until the client knows it)
    pub size: u64,
    pub quality: Option<Quality>,
    pub state: DownloadState,
    pub client_state: ClientState,
    pub added_at: i64,
    pub last_progress_at: i64,
    pub history: VecDeque<ProgressSample>,
    pub seeds: u32,
    pub leechers: u32,
    /// Consecutive qualifying stall evaluations
    pub stall_checks: u32,
    pub inactive_reason: Option<String>,
    pub content_path: Option<String>,
}

impl TrackedDownload {
    pub fn new(info_hash: String, name: String, source: String, size: u64, added_at: i64) -> Self {
        let quality = Quality::detect(&name);

        Self {
            info_hash,
            name,
            source,
            locator: None,
            size,
            quality,
            state: DownloadState::Active,
            client_state: ClientState::Unknown,
            added_at,
            last_progress_at: added_at,
            history: VecDeque::new(),
            seeds: 0,
            leechers: 0,
            stall_checks: 0,
            inactive_reason: None,
            content_path: None,
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_quality(mut self, quality: Option<Quality>) -> Self {
        if quality.is_some() {
            self.quality = quality;
        }
        self
    }

    /// Build an entry for an item the client already has (used when resuming at startup)
    pub fn from_live(status: &LiveStatus, now: i64) -> Self {
        let source = status.source.clone().unwrap_or_else(|| "unknown".to_string());
        let mut download = Self::new(
            status.info_hash.clone(),
            status.name.clone(),
            source,
            status.size,
            now,
        );
        download.client_state = status.state;
        download.seeds = status.seeds;
        download.leechers = status.leechers;
        download.content_path = status.content_path.clone();
        download
    }

    pub fn last_sample(&self) -> Option<&ProgressSample> {
        self.history.back()
    }

    /// Speed observed on the last poll, zero before the first one
    pub fn current_speed(&self) -> u64 {
        self.last_sample().map(|s| s.speed).unwrap_or(0)
    }

    pub fn is_active(&self) -> bool {
        self.state == DownloadState::Active
    }
}
