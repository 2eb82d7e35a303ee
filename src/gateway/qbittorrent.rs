//! qBittorrent Web API v2 adapter.

use crate::core::config::ClientConfig;
use crate::core::error::GatewayError;
use crate::gateway::DownloadGateway;
use crate::models::download::{ClientState, ContentFile, LiveStatus};
use crate::utils::magnet::info_hash_of;
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const SESSION_COOKIE: &str = "SID";

/// Client for the qBittorrent Web API
///
/// Keeps the session cookie from the last login and logs in again once when a
/// request is rejected with 403.
pub struct QbittorrentGateway {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    session: RwLock<Option<String>>,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct QbTorrent {
    hash: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    downloaded: i64,
    #[serde(default)]
    dlspeed: i64,
    #[serde(default)]
    num_seeds: i64,
    #[serde(default)]
    num_leechs: i64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    content_path: Option<String>,
    #[serde(default)]
    tags: String,
}

#[derive(Debug, Deserialize)]
struct QbFile {
    #[serde(default)]
    index: Option<usize>,
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    priority: i64,
}

impl From<QbTorrent> for LiveStatus {
    fn from(t: QbTorrent) -> Self {
        let source = t
            .tags
            .split(',')
            .map(str::trim)
            .find(|tag| !tag.is_empty())
            .map(str::to_string);

        LiveStatus {
            info_hash: t.hash.to_ascii_lowercase(),
            name: t.name,
            size: t.size.max(0) as u64,
            downloaded: t.downloaded.max(0) as u64,
            speed: t.dlspeed.max(0) as u64,
            seeds: t.num_seeds.clamp(0, u32::MAX as i64) as u32,
            leechers: t.num_leechs.clamp(0, u32::MAX as i64) as u32,
            state: map_state(&t.state),
            content_path: t.content_path.filter(|p| !p.is_empty()),
            source,
        }
    }
}

/// Map qBittorrent's torrent state string
pub fn map_state(raw: &str) -> ClientState {
    match raw {
        "downloading" | "forcedDL" => ClientState::Downloading,
        "stalledDL" => ClientState::Stalled,
        "metaDL" | "forcedMetaDL" => ClientState::FetchingMetadata,
        "queuedDL" => ClientState::Queued,
        "pausedDL" | "stoppedDL" => ClientState::Paused,
        "checkingDL" | "checkingResumeData" | "allocating" | "moving" => ClientState::Checking,
        "uploading" | "stalledUP" | "pausedUP" | "stoppedUP" | "queuedUP" | "forcedUP" | "checkingUP" => {
            ClientState::Completed
        }
        "error" => ClientState::Error,
        "missingFiles" => ClientState::MissingFiles,
        _ => ClientState::Unknown,
    }
}

impl QbittorrentGateway {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            session: RwLock::new(None),
            timeout_secs: config.timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, path)
    }

    fn requires_login(&self) -> bool {
        !self.username.is_empty()
    }

    fn transport_error(&self, e: reqwest::Error, wrap: fn(String) -> GatewayError) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            wrap(e.to_string())
        }
    }

    pub async fn login(&self) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.url("auth/login"))
            .header(REFERER, &self.base_url)
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await
            .map_err(|e| self.transport_error(e, GatewayError::Auth))?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(GatewayError::Auth("client refused login (too many failed attempts)".to_string()));
        }

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .find(|pair| pair.trim_start().starts_with(&format!("{}=", SESSION_COOKIE)))
            .map(|pair| pair.trim().to_string());

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, GatewayError::Auth))?;

        if body.trim() != "Ok." {
            return Err(GatewayError::Auth(format!("login rejected: {}", body.trim())));
        }

        *self.session.write() = cookie;
        info!(url = %self.base_url, "Logged in to download client");
        Ok(())
    }

    /// Send a request built by `build`, logging in first when needed and
    /// retrying once after a 403.
    async fn request<F>(&self, build: F, wrap: fn(String) -> GatewayError) -> Result<Response, GatewayError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        let needs_login = self.requires_login() && self.session.read().is_none();
        if needs_login {
            self.login().await?;
        }

        let mut response = self.send(&build, wrap).await?;

        if response.status() == StatusCode::FORBIDDEN && self.requires_login() {
            debug!("Download client session expired, logging in again");
            *self.session.write() = None;
            self.login().await?;
            response = self.send(&build, wrap).await?;
        }

        if !response.status().is_success() {
            return Err(wrap(format!("HTTP {}", response.status())));
        }

        Ok(response)
    }

    async fn send<F>(&self, build: &F, wrap: fn(String) -> GatewayError) -> Result<Response, GatewayError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        let mut request = build(&self.client).header(REFERER, &self.base_url);
        let session = self.session.read().clone();
        if let Some(cookie) = session {
            request = request.header(COOKIE, cookie);
        }

        request.send().await.map_err(|e| self.transport_error(e, wrap))
    }

    async fn torrents(
        &self,
        query: &[(&str, String)],
        wrap: fn(String) -> GatewayError,
    ) -> Result<Vec<LiveStatus>, GatewayError> {
        let url = self.url("torrents/info");
        let response = self
            .request(|client| client.get(&url).query(query), wrap)
            .await?;

        let torrents: Vec<QbTorrent> = response
            .json()
            .await
            .map_err(|e| wrap(format!("malformed torrent list: {}", e)))?;

        Ok(torrents.into_iter().map(LiveStatus::from).collect())
    }
}

#[async_trait]
impl DownloadGateway for QbittorrentGateway {
    async fn submit(&self, locator: &str, source: &str) -> Result<String, GatewayError> {
        let url = self.url("torrents/add");
        let response = self
            .request(
                |client| {
                    client
                        .post(&url)
                        .form(&[("urls", locator), ("tags", source), ("paused", "false")])
                },
                GatewayError::SubmitFailed,
            )
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, GatewayError::SubmitFailed))?;
        if body.trim() != "Ok." {
            return Err(GatewayError::SubmitFailed(format!("client answered '{}'", body.trim())));
        }

        if let Some(info_hash) = info_hash_of(locator) {
            info!(info_hash = %info_hash, source = %source, "Submitted download");
            return Ok(info_hash);
        }

        // Not a magnet: take the newest torrent carrying our tag
        let newest = self
            .torrents(
                &[
                    ("tag", source.to_string()),
                    ("sort", "added_on".to_string()),
                    ("reverse", "true".to_string()),
                    ("limit", "1".to_string()),
                ],
                GatewayError::SubmitFailed,
            )
            .await?;

        match newest.into_iter().next() {
            Some(status) => {
                info!(info_hash = %status.info_hash, source = %source, "Submitted download");
                Ok(status.info_hash)
            }
            None => {
                warn!(source = %source, "Submitted locator did not show up in the client");
                Err(GatewayError::SubmitFailed("could not resolve identifier of submitted locator".to_string()))
            }
        }
    }

    async fn status(&self, identifiers: &[String]) -> Result<Vec<LiveStatus>, GatewayError> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        self.torrents(&[("hashes", identifiers.join("|"))], GatewayError::StatusUnavailable)
            .await
    }

    async fn remove(&self, identifier: &str, delete_files: bool) -> Result<(), GatewayError> {
        let url = self.url("torrents/delete");
        let delete_files = if delete_files { "true" } else { "false" };

        self.request(
            |client| {
                client
                    .post(&url)
                    .form(&[("hashes", identifier), ("deleteFiles", delete_files)])
            },
            GatewayError::RemoveFailed,
        )
        .await?;

        info!(info_hash = %identifier, delete_files = %delete_files, "Removed torrent from client");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LiveStatus>, GatewayError> {
        self.torrents(&[], GatewayError::StatusUnavailable).await
    }

    async fn files(&self, identifier: &str) -> Result<Vec<ContentFile>, GatewayError> {
        let url = self.url("torrents/files");
        let response = self
            .request(
                |client| client.get(&url).query(&[("hash", identifier)]),
                GatewayError::FilesUnavailable,
            )
            .await?;

        let files: Vec<QbFile> = response
            .json()
            .await
            .map_err(|e| GatewayError::FilesUnavailable(format!("malformed file list: {}", e)))?;

        // Older clients omit the index and rely on list order
        Ok(files
            .into_iter()
            .enumerate()
            .map(|(position, f)| ContentFile {
                index: f.index.unwrap_or(position),
                name: f.name,
                size: f.size.max(0) as u64,
                priority: f.priority.clamp(0, u8::MAX as i64) as u8,
            })
            .collect())
    }

    async fn set_file_priority(&self, identifier: &str, indexes: &[usize], priority: u8) -> Result<(), GatewayError> {
        if indexes.is_empty() {
            return Ok(());
        }

        let url = self.url("torrents/filePrio");
        let ids = indexes.iter().map(usize::to_string).collect::<Vec<_>>().join("|");
        let priority = priority.to_string();

        self.request(
            |client| {
                client.post(&url).form(&[
                    ("hash", identifier),
                    ("id", ids.as_str()),
                    ("priority", priority.as_str()),
                ])
            },
            GatewayError::FilesUnavailable,
        )
        .await?;

        debug!(info_hash = %identifier, files = indexes.len(), priority = %priority, "Updated file priorities");
        Ok(())
    }
}
