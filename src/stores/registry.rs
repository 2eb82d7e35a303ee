use crate::core::error::RegistryError;
use crate::models::download::{DownloadState, LiveStatus, ProgressSample, TrackedDownload};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory table of tracked downloads
///
/// Every operation takes the lock once and releases it before returning, so
/// callers never observe a half-applied change.
pub struct TorrentRegistry {
    downloads: RwLock<HashMap<String, TrackedDownload>>,
    history_len: usize,
}

impl TorrentRegistry {
    pub fn new(history_len: usize) -> Self {
        Self {
            downloads: RwLock::new(HashMap::new()),
            history_len: history_len.max(1),
        }
    }

    pub fn track(&self, download: TrackedDownload) -> Result<(), RegistryError> {
        let mut downloads = self.downloads.write();

        if downloads.contains_key(&download.info_hash) {
            return Err(RegistryError::DuplicateIdentifier(download.info_hash));
        }

        downloads.insert(download.info_hash.clone(), download);
        Ok(())
    }

    /// Record a live observation
    ///
    /// `last_progress_at` moves only when the byte count grew past the previous
    /// sample; a smaller count (client recheck) is clamped to keep the history
    /// monotonic.
    pub fn refresh(&self, info_hash: &str, status: &LiveStatus, now: i64) -> Result<(), RegistryError> {
        let mut downloads = self.downloads.write();
        let download = downloads
            .get_mut(info_hash)
            .ok_or_else(|| RegistryError::NotFound(info_hash.to_string()))?;

        let previous = download.history.back().map(|s| s.downloaded).unwrap_or(0);
        let downloaded = status.downloaded.max(previous);

        if downloaded > previous {
            download.last_progress_at = now;
        }

        download.history.push_back(ProgressSample {
            timestamp: now,
            downloaded,
            speed: status.speed,
        });
        while download.history.len() > self.history_len {
            download.history.pop_front();
        }

        download.client_state = status.state;
        download.seeds = status.seeds;
        download.leechers = status.leechers;
        if status.size > 0 {
            download.size = status.size;
        }
        if status.content_path.is_some() {
            download.content_path = status.content_path.clone();
        }
        if download.name.is_empty() && !status.name.is_empty() {
            download.name = status.name.clone();
        }

        Ok(())
    }

    /// Swap `old` for `replacement` in one step; the replacement starts with empty history
    pub fn replace(&self, old: &str, mut replacement: TrackedDownload) -> Result<(), RegistryError> {
        let mut downloads = self.downloads.write();

        if !downloads.contains_key(old) {
            return Err(RegistryError::NotFound(old.to_string()));
        }
        if replacement.info_hash != old && downloads.contains_key(&replacement.info_hash) {
            return Err(RegistryError::DuplicateIdentifier(replacement.info_hash));
        }

        replacement.history.clear();
        replacement.stall_checks = 0;

        downloads.remove(old);
        downloads.insert(replacement.info_hash.clone(), replacement);
        Ok(())
    }

    pub fn remove(&self, info_hash: &str) -> Option<TrackedDownload> {
        self.downloads.write().remove(info_hash)
    }

    pub fn get(&self, info_hash: &str) -> Option<TrackedDownload> {
        self.downloads.read().get(info_hash).cloned()
    }

    pub fn contains(&self, info_hash: &str) -> bool {
        self.downloads.read().contains_key(info_hash)
    }

    /// Snapshot of every entry, oldest first
    pub fn list(&self) -> Vec<TrackedDownload> {
        let mut snapshot: Vec<TrackedDownload> = self.downloads.read().values().cloned().collect();
        snapshot.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.info_hash.cmp(&b.info_hash))
        });
        snapshot
    }

    /// Identifiers the scheduler should poll, oldest first
    pub fn active_identifiers(&self) -> Vec<String> {
        let downloads = self.downloads.read();
        let mut active: Vec<(&i64, &String)> = downloads
            .values()
            .filter(|d| d.is_active())
            .map(|d| (&d.added_at, &d.info_hash))
            .collect();
        active.sort();
        active.into_iter().map(|(_, hash)| hash.clone()).collect()
    }

    pub fn set_stall_checks(&self, info_hash: &str, stall_checks: u32) -> bool {
        match self.downloads.write().get_mut(info_hash) {
            Some(download) => {
                download.stall_checks = stall_checks;
                true
            }
            None => false,
        }
    }

    pub fn mark_inactive(&self, info_hash: &str, reason: &str) -> bool {
        match self.downloads.write().get_mut(info_hash) {
            Some(download) => {
                download.state = DownloadState::Inactive;
                download.inactive_reason = Some(reason.to_string());
                true
            }
            None => false,
        }
    }

    /// Returns true only for the first transition into `Completed`
    pub fn mark_completed(&self, info_hash: &str) -> bool {
        match self.downloads.write().get_mut(info_hash) {
            Some(download) if download.state == DownloadState::Active => {
                download.state = DownloadState::Completed;
                download.stall_checks = 0;
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.downloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloads.read().is_empty()
    }
}
