use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time in seconds; a clock set before the epoch reads as 0
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Seconds elapsed from `earlier` to `now`, never negative
pub fn seconds_since(earlier: i64, now: i64) -> u64 {
    now.saturating_sub(earlier).max(0) as u64
}
