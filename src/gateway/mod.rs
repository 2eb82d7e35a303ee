pub mod qbittorrent;

use crate::core::error::GatewayError;
use crate::models::download::{ContentFile, LiveStatus};
use async_trait::async_trait;

/// Download client operations the engine relies on
#[async_trait]
pub trait DownloadGateway: Send + Sync {
    /// Hand a locator to the client; returns the content identifier
    async fn submit(&self, locator: &str, source: &str) -> Result<String, GatewayError>;

    /// Live status for the given identifiers. Identifiers the client does not
    /// know are simply absent from the result.
    async fn status(&self, identifiers: &[String]) -> Result<Vec<LiveStatus>, GatewayError>;

    async fn remove(&self, identifier: &str, delete_files: bool) -> Result<(), GatewayError>;

    /// Everything the client currently holds
    async fn list(&self) -> Result<Vec<LiveStatus>, GatewayError>;

    /// Files of one torrent; empty until the client has its metadata
    async fn files(&self, identifier: &str) -> Result<Vec<ContentFile>, GatewayError>;

    async fn set_file_priority(&self, identifier: &str, indexes: &[usize], priority: u8) -> Result<(), GatewayError>;
}
