use crate::stores::blacklist::BlacklistStore;
use crate::stores::registry::TorrentRegistry;
use crate::utils::time::current_timestamp;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub monitoring_cycles: AtomicU64,
    pub skipped_cycles: AtomicU64,
    pub stalls_detected: AtomicU64,
    pub failures_detected: AtomicU64,
    pub replacements: AtomicU64,
    pub no_alternatives: AtomicU64,
    pub gateway_failures: AtomicU64,
    pub completions: AtomicU64,
    pub searches: AtomicU64,
    pub provider_failures: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub monitoring_cycles: u64,
    pub skipped_cycles: u64,
    pub stalls_detected: u64,
    pub failures_detected: u64,
    pub replacements: u64,
    pub no_alternatives: u64,
    pub gateway_failures: u64,
    pub completions: u64,
    pub searches: u64,
    pub provider_failures: u64,
    /// Share of stalled or failed downloads that got a working replacement
    pub replacement_rate: f64,
    pub tracked_downloads: usize,
    pub active_downloads: usize,
    pub blacklisted: usize,
    pub uptime_seconds: i64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            monitoring_cycles: AtomicU64::new(0),
            skipped_cycles: AtomicU64::new(0),
            stalls_detected: AtomicU64::new(0),
            failures_detected: AtomicU64::new(0),
            replacements: AtomicU64::new(0),
            no_alternatives: AtomicU64::new(0),
            gateway_failures: AtomicU64::new(0),
            completions: AtomicU64::new(0),
            searches: AtomicU64::new(0),
            provider_failures: AtomicU64::new(0),
            start_time: current_timestamp(),
        }
    }

    pub fn increment_cycles(&self) {
        self.monitoring_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped_cycles(&self) {
        self.skipped_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stalls(&self) {
        self.stalls_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.failures_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replacements(&self) {
        self.replacements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_no_alternatives(&self) {
        self.no_alternatives.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_gateway_failures(&self) {
        self.gateway_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_completions(&self) {
        self.completions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_searches(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_provider_failures(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter and derives replacement_rate and uptime_seconds.
    pub fn get_snapshot(&self, registry: &TorrentRegistry, blacklist: &BlacklistStore) -> MetricsSnapshot {
        let stalls_detected = self.stalls_detected.load(Ordering::Relaxed);
        let failures_detected = self.failures_detected.load(Ordering::Relaxed);
        let replacements = self.replacements.load(Ordering::Relaxed);

        let handled = stalls_detected + failures_detected;
        let replacement_rate = if handled > 0 {
            (replacements as f64 / handled as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            monitoring_cycles: self.monitoring_cycles.load(Ordering::Relaxed),
            skipped_cycles: self.skipped_cycles.load(Ordering::Relaxed),
            stalls_detected,
            failures_detected,
            replacements,
            no_alternatives: self.no_alternatives.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
            completions: self.completions.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            replacement_rate,
            tracked_downloads: registry.len(),
            active_downloads: registry.active_identifiers().len(),
            blacklisted: blacklist.len(),
            uptime_seconds: current_timestamp() - self.start_time,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
