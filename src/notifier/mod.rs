pub mod jellyfin;

use async_trait::async_trait;

/// Post-completion hook into a media library
#[async_trait]
pub trait MediaNotifier: Send + Sync {
    /// Best effort; implementations log failures instead of returning them
    async fn notify_completed(&self, content_path: &str);
}
