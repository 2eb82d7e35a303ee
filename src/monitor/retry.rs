use crate::core::error::RegistryError;
use crate::gateway::DownloadGateway;
use crate::metrics::collector::Metrics;
use crate::models::blacklist::BlacklistReason;
use crate::models::download::TrackedDownload;
use crate::models::history::{OutcomeEvent, OutcomeRecord};
use crate::models::search::SearchRequest;
use crate::monitor::detector::Verdict;
use crate::monitor::files::spawn_skip_extras;
use crate::monitor::{gateway_call, MonitoringConfig};
use crate::search::aggregator::SearchAggregator;
use crate::stores::blacklist::BlacklistStore;
use crate::stores::history::OutcomeHistory;
use crate::stores::registry::TorrentRegistry;
use crate::utils::time::current_timestamp;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tokens that mark the start of release metadata in a torrent name
const RELEASE_TOKENS: &[&str] = &[
    "480p", "576p", "720p", "1080p", "1080i", "2160p", "4k", "uhd", "web", "webrip", "web-dl",
    "webdl", "web-rip", "bluray", "blu-ray", "brrip", "bdrip", "dvdrip", "dvdscr", "hdtv", "hdrip",
    "hdcam", "cam", "x264", "x265", "h264", "h265", "hevc", "xvid", "remux", "hdr", "10bit",
    "proper", "repack",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "info_hash", rename_all = "snake_case")]
pub enum RetryOutcome {
    Replaced(String),
    NoAlternative,
    GatewayFailed,
}

/// Replaces stalled or failed downloads with the best available alternative
pub struct RetryEngine {
    registry: Arc<TorrentRegistry>,
    blacklist: Arc<BlacklistStore>,
    history: Arc<OutcomeHistory>,
    aggregator: Arc<SearchAggregator>,
    gateway: Arc<dyn DownloadGateway>,
    config: Arc<MonitoringConfig>,
    metrics: Arc<Metrics>,
}

impl RetryEngine {
    pub fn new(
        registry: Arc<TorrentRegistry>,
        blacklist: Arc<BlacklistStore>,
        history: Arc<OutcomeHistory>,
        aggregator: Arc<SearchAggregator>,
        gateway: Arc<dyn DownloadGateway>,
        config: Arc<MonitoringConfig>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            blacklist,
            history,
            aggregator,
            gateway,
            config,
            metrics,
        }
    }

    /// Blacklist `download`, then try to swap in a replacement
    ///
    /// One submission attempt per call. The stalled identifier stays
    /// blacklisted whatever the outcome.
    pub async fn handle_stall(&self, download: &TrackedDownload, verdict: Verdict) -> RetryOutcome {
        let hash = download.info_hash.as_str();
        let (reason, event) = match verdict {
            Verdict::Failed => {
                self.metrics.increment_failures();
                (BlacklistReason::Failed, OutcomeEvent::Failed)
            }
            _ => {
                self.metrics.increment_stalls();
                (BlacklistReason::Stalled, OutcomeEvent::Stalled)
            }
        };

        warn!(
            info_hash = %hash,
            name = %download.name,
            reason = %reason,
            client_state = ?download.client_state,
            stall_checks = download.stall_checks,
            "Download disqualified, looking for a replacement"
        );

        if let Err(e) = self.blacklist.add(hash, &download.name, reason) {
            error!(info_hash = %hash, error = %e, "Failed to journal blacklist entry");
        }
        self.record(
            OutcomeRecord::new(hash, &download.name, &download.source, event, current_timestamp())
                .with_detail(format!("{:?}", download.client_state)),
        );

        if let Err(e) = gateway_call(self.config.gateway_timeout, self.gateway.remove(hash, false)).await {
            warn!(info_hash = %hash, error = %e, "Failed to remove disqualified torrent from client");
        }

        let request = SearchRequest {
            query: derive_query(&download.name),
            quality: download.quality,
            exclude: vec![hash.to_string()],
            ..Default::default()
        };
        let candidates = self.aggregator.search(&request).await;

        let Some(best) = candidates.into_iter().next() else {
            self.registry.mark_inactive(hash, "no alternative found");
            self.metrics.increment_no_alternatives();
            self.record(OutcomeRecord::new(
                hash,
                &download.name,
                &download.source,
                OutcomeEvent::NoAlternative,
                current_timestamp(),
            ));
            info!(info_hash = %hash, query = %request.query, "No alternative found, download marked inactive");
            return RetryOutcome::NoAlternative;
        };

        let new_hash = match gateway_call(
            self.config.gateway_timeout,
            self.gateway.submit(&best.locator, &best.source),
        )
        .await
        {
            Ok(new_hash) => new_hash,
            Err(e) => {
                self.registry.remove(hash);
                self.metrics.increment_gateway_failures();
                self.record(
                    OutcomeRecord::new(
                        hash,
                        &download.name,
                        &download.source,
                        OutcomeEvent::GatewayFailed,
                        current_timestamp(),
                    )
                    .with_detail(e.to_string()),
                );
                error!(info_hash = %hash, candidate = %best.info_hash, error = %e, "Failed to submit replacement");
                return RetryOutcome::GatewayFailed;
            }
        };

        spawn_skip_extras(Arc::clone(&self.gateway), Arc::clone(&self.config), new_hash.clone());

        let now = current_timestamp();
        let replacement = TrackedDownload::new(new_hash.clone(), best.title.clone(), best.source.clone(), best.size, now)
            .with_locator(best.locator.clone())
            .with_quality(best.quality.or(download.quality));

        match self.registry.replace(hash, replacement.clone()) {
            Ok(()) => {}
            Err(RegistryError::DuplicateIdentifier(_)) => {
                self.registry.remove(hash);
            }
            Err(RegistryError::NotFound(_)) => {
                // Removed by an operator mid-retry; the client has the replacement now
                if let Err(e) = self.registry.track(replacement) {
                    warn!(info_hash = %new_hash, error = %e, "Failed to track replacement");
                }
            }
        }

        self.metrics.increment_replacements();
        self.record(OutcomeRecord::new(
            hash,
            &download.name,
            &download.source,
            OutcomeEvent::Replaced { by: new_hash.clone() },
            now,
        ));
        self.record(OutcomeRecord::new(&new_hash, &best.title, &best.source, OutcomeEvent::Added, now));

        info!(
            old = %hash,
            new = %new_hash,
            name = %best.title,
            source = %best.source,
            seeds = best.seeds,
            "Replaced download"
        );

        RetryOutcome::Replaced(new_hash)
    }

    fn record(&self, record: OutcomeRecord) {
        if let Err(e) = self.history.record(record) {
            error!(error = %e, "Failed to journal outcome record");
        }
    }
}

/// Search text for a torrent name: separators become spaces and everything
/// from the first resolution or release tag on is dropped.
pub fn derive_query(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| match c {
            '.' | '_' | '[' | ']' | '(' | ')' | '{' | '}' => ' ',
            other => other,
        })
        .collect();

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let title: Vec<&str> = tokens
        .iter()
        .take_while(|token| !RELEASE_TOKENS.contains(&token.to_ascii_lowercase().as_str()))
        .copied()
        .collect();

    if title.is_empty() {
        tokens.join(" ")
    } else {
        title.join(" ")
    }
}
