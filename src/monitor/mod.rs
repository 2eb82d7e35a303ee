pub mod detector;
pub mod files;
pub mod retry;
pub mod scheduler;

use crate::core::config::Config;
use crate::core::error::GatewayError;
use crate::utils::size::gb_to_bytes;
use std::future::Future;
use std::time::Duration;

/// Immutable snapshot of the tuning knobs, built once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringConfig {
    pub interval: Duration,
    pub min_seeds: u32,
    /// Bytes per second
    pub min_speed: u64,
    pub max_stall_checks: u32,
    /// Default size bounds in bytes
    pub min_size: u64,
    pub max_size: u64,
    /// Enabled source names; position is priority
    pub allowed_sources: Vec<String>,
    pub history_len: usize,
    pub gateway_timeout: Duration,
    pub search_timeout: Duration,
    pub max_results: usize,
    pub video_extensions: Vec<String>,
    /// Payload files with these extensions are not downloaded
    pub excluded_extensions: Vec<String>,
    /// Pause between file list reads while metadata is being fetched
    pub metadata_poll: Duration,
}

impl MonitoringConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.monitoring.interval_secs),
            min_seeds: config.monitoring.min_seeds,
            min_speed: config.monitoring.min_speed_kbps.saturating_mul(1024),
            max_stall_checks: config.monitoring.max_stall_checks,
            min_size: gb_to_bytes(config.search.default_min_size_gb),
            max_size: gb_to_bytes(config.search.default_max_size_gb),
            allowed_sources: config.enabled_sources().map(|s| s.name.clone()).collect(),
            history_len: config.monitoring.history_len,
            gateway_timeout: Duration::from_secs(config.client.timeout_secs),
            search_timeout: Duration::from_secs(config.search.timeout_secs),
            max_results: config.search.max_results,
            video_extensions: config
                .search
                .video_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            excluded_extensions: config
                .search
                .excluded_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            metadata_poll: Duration::from_secs(2),
        }
    }

    /// Position of `source` in the priority order; unknown sources sort last
    pub fn source_priority(&self, source: &str) -> usize {
        self.allowed_sources
            .iter()
            .position(|s| s.eq_ignore_ascii_case(source))
            .unwrap_or(self.allowed_sources.len())
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            min_seeds: 1,
            min_speed: 10 * 1024,
            max_stall_checks: 3,
            min_size: gb_to_bytes(0.1),
            max_size: gb_to_bytes(50.0),
            allowed_sources: Vec::new(),
            history_len: 32,
            gateway_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(30),
            max_results: 50,
            video_extensions: [".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            excluded_extensions: [".txt", ".nfo", ".jpg", ".png", ".srt", ".sub"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            metadata_poll: Duration::from_secs(2),
        }
    }
}

/// Run a gateway call under the configured deadline
pub async fn gateway_call<T, F>(timeout: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(timeout.as_secs())),
    }
}
