pub mod http_json;

use crate::core::error::ProviderError;
use crate::models::search::SearchResult;
use async_trait::async_trait;

/// One search site
///
/// Adapters map whatever the site returns into `SearchResult`s carrying a
/// normalized info hash and their own `name()` as source.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError>;
}
