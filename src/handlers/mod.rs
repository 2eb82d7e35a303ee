pub mod blacklist;
pub mod downloads;
pub mod fallback;
pub mod health;
pub mod history;
pub mod metrics;
pub mod monitoring;
pub mod search;

use crate::core::error::ApiError;
use crate::core::state::AppState;
use tracing::warn;

/// Reject the request unless `provided` matches the configured API key
pub(crate) fn authorize(state: &AppState, provided: &str, action: &str) -> Result<(), ApiError> {
    if keys_match(provided.as_bytes(), state.config.server.api_key.as_bytes()) {
        Ok(())
    } else {
        warn!(action = action, "Rejected request with invalid API key");
        Err(ApiError::InvalidApiKey)
    }
}

/// Constant time in the key length
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
