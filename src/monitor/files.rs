use crate::gateway::DownloadGateway;
use crate::models::download::ContentFile;
use crate::monitor::{gateway_call, MonitoringConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SKIP_PRIORITY: u8 = 0;

/// Attempts at reading the file list while the client fetches metadata
const FILE_LIST_ATTEMPTS: u32 = 5;

/// Indexes of files to leave undownloaded: excluded extensions that are not
/// also video payload
pub fn unwanted_files(files: &[ContentFile], config: &MonitoringConfig) -> Vec<usize> {
    files
        .iter()
        .filter(|file| {
            let name = file.name.to_ascii_lowercase();
            let excluded = config.excluded_extensions.iter().any(|ext| name.ends_with(ext.as_str()));
            let video = config.video_extensions.iter().any(|ext| name.ends_with(ext.as_str()));
            excluded && !video
        })
        .map(|file| file.index)
        .collect()
}

/// Turn off downloading of extras for a freshly submitted torrent
///
/// Best effort: every failure is logged and swallowed. Returns the number of
/// files skipped.
pub async fn skip_extras(
    gateway: Arc<dyn DownloadGateway>,
    config: Arc<MonitoringConfig>,
    identifier: String,
) -> usize {
    if config.excluded_extensions.is_empty() {
        return 0;
    }

    let mut files = Vec::new();
    for attempt in 1..=FILE_LIST_ATTEMPTS {
        match gateway_call(config.gateway_timeout, gateway.files(&identifier)).await {
            Ok(listed) if !listed.is_empty() => {
                files = listed;
                break;
            }
            Ok(_) => debug!(info_hash = %identifier, attempt, "File list not available yet"),
            Err(e) => {
                warn!(info_hash = %identifier, error = %e, "Failed to read torrent files");
                return 0;
            }
        }

        if attempt < FILE_LIST_ATTEMPTS {
            tokio::time::sleep(config.metadata_poll).await;
        }
    }

    let unwanted = unwanted_files(&files, &config);
    if unwanted.is_empty() {
        return 0;
    }

    match gateway_call(
        config.gateway_timeout,
        gateway.set_file_priority(&identifier, &unwanted, SKIP_PRIORITY),
    )
    .await
    {
        Ok(()) => {
            info!(info_hash = %identifier, skipped = unwanted.len(), "Skipping non-video files");
            unwanted.len()
        }
        Err(e) => {
            warn!(info_hash = %identifier, error = %e, "Failed to skip non-video files");
            0
        }
    }
}

/// Run [`skip_extras`] in the background
pub fn spawn_skip_extras(gateway: Arc<dyn DownloadGateway>, config: Arc<MonitoringConfig>, identifier: String) {
    tokio::spawn(skip_extras(gateway, config, identifier));
}
