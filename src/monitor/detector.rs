//! Stall classification.
//!
//! An evaluation qualifies as stalled when any one of these holds:
//! no new bytes for at least one polling interval, fewer seeds than
//! `min_seeds`, or a speed below `min_speed`. A download is declared
//! `Stalled` only after `max_stall_checks` consecutive qualifying
//! evaluations; one clean evaluation resets the count.

use crate::models::download::{ClientState, TrackedDownload};
use crate::monitor::MonitoringConfig;
use crate::utils::time::seconds_since;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Healthy,
    Stalled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StallReason {
    NoProgress,
    LowSeeds,
    LowSpeed,
    ClientFailure(ClientState),
}

impl fmt::Display for StallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StallReason::NoProgress => f.write_str("no progress"),
            StallReason::LowSeeds => f.write_str("too few seeds"),
            StallReason::LowSpeed => f.write_str("speed below threshold"),
            StallReason::ClientFailure(state) => write!(f, "client reported {:?}", state),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: Verdict,
    /// Counter value to store back on the download
    pub stall_checks: u32,
    /// Why this evaluation qualified, if it did
    pub reason: Option<StallReason>,
}

impl Assessment {
    fn healthy() -> Self {
        Self {
            verdict: Verdict::Healthy,
            stall_checks: 0,
            reason: None,
        }
    }
}

/// Classify one download against the thresholds at time `now`
pub fn classify(download: &TrackedDownload, config: &MonitoringConfig, now: i64) -> Assessment {
    if download.client_state.is_failure() {
        return Assessment {
            verdict: Verdict::Failed,
            stall_checks: download.stall_checks,
            reason: Some(StallReason::ClientFailure(download.client_state)),
        };
    }

    if download.client_state.is_idle() {
        return Assessment::healthy();
    }

    let Some(reason) = qualifying_reason(download, config, now) else {
        return Assessment::healthy();
    };

    let stall_checks = download.stall_checks.saturating_add(1);
    let verdict = if stall_checks >= config.max_stall_checks {
        Verdict::Stalled
    } else {
        Verdict::Healthy
    };

    Assessment {
        verdict,
        stall_checks,
        reason: Some(reason),
    }
}

fn qualifying_reason(download: &TrackedDownload, config: &MonitoringConfig, now: i64) -> Option<StallReason> {
    if seconds_since(download.last_progress_at, now) >= config.interval.as_secs() {
        return Some(StallReason::NoProgress);
    }
    if download.seeds < config.min_seeds {
        return Some(StallReason::LowSeeds);
    }
    if download.current_speed() < config.min_speed {
        return Some(StallReason::LowSpeed);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::download::ProgressSample;

    const INTERVAL: i64 = 60;

    fn config() -> MonitoringConfig {
        MonitoringConfig {
            min_seeds: 1,
            min_speed: 10 * 1024,
            max_stall_checks: 3,
            ..MonitoringConfig::default()
        }
    }

    /// Downloading with plenty of seeds and speed, progress observed at `now`
    fn healthy_download(now: i64) -> TrackedDownload {
        let mut download = TrackedDownload::new("a".repeat(40), "X".into(), "test".into(), 0, 0);
        download.client_state = ClientState::Downloading;
        download.seeds = 20;
        download.last_progress_at = now;
        download.history.push_back(ProgressSample {
            timestamp: now,
            downloaded: 1_000_000,
            speed: 500 * 1024,
        });
        download
    }

    #[test]
    fn test_healthy_download() {
        let download = healthy_download(100);
        let assessment = classify(&download, &config(), 100);

        assert_eq!(assessment, Assessment::healthy());
    }

    #[test]
    fn test_each_condition_qualifies_on_its_own() {
        let config = config();

        let mut no_progress = healthy_download(0);
        no_progress.last_progress_at = 0;
        assert_eq!(classify(&no_progress, &config, INTERVAL).reason, Some(StallReason::NoProgress));

        let mut low_seeds = healthy_download(100);
        low_seeds.seeds = 0;
        assert_eq!(classify(&low_seeds, &config, 100).reason, Some(StallReason::LowSeeds));

        let mut low_speed = healthy_download(100);
        low_speed.history.back_mut().unwrap().speed = 1024;
        assert_eq!(classify(&low_speed, &config, 100).reason, Some(StallReason::LowSpeed));
    }

    #[test]
    fn test_stalled_only_after_consecutive_checks() {
        let config = config();
        let mut download = healthy_download(100);
        download.seeds = 0;

        let mut verdicts = Vec::new();
        for poll in 0..3 {
            let assessment = classify(&download, &config, 100 + poll);
            download.stall_checks = assessment.stall_checks;
            verdicts.push(assessment.verdict);
        }

        assert_eq!(verdicts, vec![Verdict::Healthy, Verdict::Healthy, Verdict::Stalled]);
        assert_eq!(download.stall_checks, 3);
    }

    #[test]
    fn test_counter_resets_on_clean_evaluation() {
        let config = config();
        let mut download = healthy_download(100);

        // Two bad polls, one good, two bad: never reaches three in a row
        for seeds in [0, 0, 5, 0, 0] {
            download.seeds = seeds;
            let assessment = classify(&download, &config, 100);
            assert_ne!(assessment.verdict, Verdict::Stalled);
            download.stall_checks = assessment.stall_checks;
        }

        assert_eq!(download.stall_checks, 2);
    }

    #[test]
    fn test_failure_states() {
        let config = config();
        for state in [ClientState::Error, ClientState::MissingFiles, ClientState::Missing] {
            let mut download = healthy_download(100);
            download.client_state = state;
            download.stall_checks = 1;

            let assessment = classify(&download, &config, 100);
            assert_eq!(assessment.verdict, Verdict::Failed);
            assert_eq!(assessment.stall_checks, 1);
            assert_eq!(assessment.reason, Some(StallReason::ClientFailure(state)));
        }
    }

    #[test]
    fn test_idle_states_are_not_evaluated() {
        let config = config();
        for state in [ClientState::Paused, ClientState::Queued, ClientState::Checking, ClientState::Completed] {
            let mut download = healthy_download(0);
            download.client_state = state;
            download.seeds = 0;
            download.stall_checks = 2;

            assert_eq!(classify(&download, &config, 10_000), Assessment::healthy());
        }
    }

    #[test]
    fn test_single_check_threshold() {
        let config = MonitoringConfig {
            max_stall_checks: 1,
            ..config()
        };
        let mut download = healthy_download(100);
        download.seeds = 0;

        assert_eq!(classify(&download, &config, 100).verdict, Verdict::Stalled);
    }
}
