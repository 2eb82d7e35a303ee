use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::state::AppState;
use crate::gateway::{qbittorrent::QbittorrentGateway, DownloadGateway};
use crate::models::download::{ClientState, TrackedDownload};
use crate::monitor::{gateway_call, MonitoringConfig};
use crate::notifier::{jellyfin::JellyfinNotifier, MediaNotifier};
use crate::providers::{http_json::HttpJsonProvider, SourceProvider};
use crate::utils::time::current_timestamp;
use crate::wal::wal::WalOperation;

// this runs at boot time, before anything else touches the stores
pub fn apply_wal_operations(state: &AppState, operations: &[WalOperation]) -> Result<()> {
    for op in operations {
        match op {
            WalOperation::Blacklist { entry } => state.blacklist.restore(entry.clone()),
            WalOperation::Unblacklist { info_hash } => state.blacklist.restore_removal(info_hash),
            WalOperation::Outcome { record } => state.history.restore(record.clone()),
        }
    }
    Ok(())
}

/// Rewrite the journal down to the live blacklist plus the retained history
///
/// Returns the number of operations written.
pub fn compact_wal(state: &AppState) -> Result<usize> {
    let operations: Vec<WalOperation> = state
        .blacklist
        .all()
        .into_iter()
        .map(|entry| WalOperation::Blacklist { entry })
        .chain(
            state
                .history
                .all()
                .into_iter()
                .map(|record| WalOperation::Outcome { record }),
        )
        .collect();

    state
        .wal
        .rewrite(&operations)
        .context("Failed to compact WAL")?;

    Ok(operations.len())
}

/// Track every unfinished, non-blacklisted item the download client already has
pub async fn resume_from_gateway(state: &AppState) -> Result<usize> {
    let items = gateway_call(state.monitoring.gateway_timeout, state.gateway.list())
        .await
        .context("Failed to list torrents from download client")?;

    let now = current_timestamp();
    let mut resumed = 0;

    for status in &items {
        if status.state == ClientState::Completed
            || state.blacklist.contains(&status.info_hash)
            || state.registry.contains(&status.info_hash)
        {
            continue;
        }

        match state.registry.track(TrackedDownload::from_live(status, now)) {
            Ok(()) => resumed += 1,
            Err(e) => warn!(info_hash = %status.info_hash, error = %e, "Could not resume download"),
        }
    }

    info!(
        listed = items.len(),
        resumed = resumed,
        "Resumed downloads from download client"
    );

    Ok(resumed)
}

pub fn build_gateway(config: &Config) -> Result<Arc<dyn DownloadGateway>> {
    let gateway = QbittorrentGateway::new(&config.client)
        .context("Failed to create qBittorrent gateway")?;
    Ok(Arc::new(gateway))
}

/// One provider per enabled source, in priority order
pub fn build_providers(
    config: &Config,
    monitoring: &MonitoringConfig,
) -> Result<Vec<Arc<dyn SourceProvider>>> {
    config
        .enabled_sources()
        .map(|source| {
            let provider = HttpJsonProvider::new(source, monitoring.search_timeout)
                .context(format!("Failed to create provider '{}'", source.name))?;
            Ok(Arc::new(provider) as Arc<dyn SourceProvider>)
        })
        .collect()
}

pub fn build_notifier(config: &Config) -> Result<Option<Arc<dyn MediaNotifier>>> {
    if !config.notifier.enabled {
        return Ok(None);
    }

    let notifier = JellyfinNotifier::new(&config.notifier)
        .context("Failed to create media notifier")?;
    Ok(Some(Arc::new(notifier)))
}
