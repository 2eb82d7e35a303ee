use serde::{Deserialize, Serialize};

/// What happened to a download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeEvent {
    Added,
    Completed,
    Stalled,
    Failed,
    Replaced { by: String },
    NoAlternative,
    GatewayFailed,
    Removed,
}

/// One durable entry of the download-outcome history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub info_hash: String,
    pub name: String,
    pub source: String,
    pub event: OutcomeEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub timestamp: i64,
}

impl OutcomeRecord {
    pub fn new(
        info_hash: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
        event: OutcomeEvent,
        timestamp: i64,
    ) -> Self {
        Self {
            info_hash: info_hash.into(),
            name: name.into(),
            source: source.into(),
            event,
            detail: None,
            timestamp,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
