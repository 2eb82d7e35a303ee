use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    Stalled,
    Failed,
    Manual,
}

impl fmt::Display for BlacklistReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            BlacklistReason::Stalled => "stalled",
            BlacklistReason::Failed => "failed",
            BlacklistReason::Manual => "manual",
        };
        f.write_str(reason)
    }
}

/// Permanent disqualification of one content identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub info_hash: String,
    pub name: String,
    pub reason: BlacklistReason,
    /// Unix timestamp of the first (and only) insertion
    pub timestamp: i64,
}
