use crate::core::config::NotifierConfig;
use crate::notifier::MediaNotifier;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const TOKEN_HEADER: &str = "X-Emby-Token";

/// Triggers a Jellyfin library refresh once a download completes
pub struct JellyfinNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct MediaFolders {
    #[serde(rename = "Items", default)]
    items: Vec<MediaFolder>,
}

#[derive(Debug, Deserialize)]
struct MediaFolder {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Locations", default)]
    locations: Vec<String>,
}

impl JellyfinNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Id of the library whose location contains `content_path`
    async fn find_library(&self, content_path: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/Library/MediaFolders", self.base_url))
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to list media folders")?;

        if !response.status().is_success() {
            bail!("Media folder listing returned {}", response.status());
        }

        let folders: MediaFolders = response.json().await.context("Malformed media folder listing")?;
        let content_path = Path::new(content_path);

        Ok(folders
            .items
            .into_iter()
            .find(|folder| {
                folder
                    .locations
                    .iter()
                    .any(|location| content_path.starts_with(Path::new(location)))
            })
            .map(|folder| {
                info!(library = %folder.name, "Matched completed download to library");
                folder.id
            }))
    }

    async fn refresh(&self, library_id: Option<&str>) -> Result<()> {
        let request = match library_id {
            Some(id) => self
                .client
                .post(format!("{}/Items/{}/Refresh", self.base_url, id))
                .query(&[
                    ("Recursive", "true"),
                    ("ImageRefreshMode", "Default"),
                    ("MetadataRefreshMode", "Default"),
                    ("ReplaceAllImages", "false"),
                    ("ReplaceAllMetadata", "false"),
                ]),
            None => self.client.post(format!("{}/Library/Refresh", self.base_url)),
        };

        let response = request
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to request library refresh")?;

        if !response.status().is_success() {
            bail!("Library refresh returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl MediaNotifier for JellyfinNotifier {
    async fn notify_completed(&self, content_path: &str) {
        let library = match self.find_library(content_path).await {
            Ok(library) => library,
            Err(e) => {
                warn!(error = %e, "Could not resolve library, refreshing everything");
                None
            }
        };

        match self.refresh(library.as_deref()).await {
            Ok(()) => info!(path = %content_path, library = ?library, "Library refresh requested"),
            Err(e) => warn!(path = %content_path, error = %e, "Library refresh failed"),
        }
    }
}
