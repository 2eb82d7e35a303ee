use crate::gateway::DownloadGateway;
use crate::metrics::collector::Metrics;
use crate::models::download::{ClientState, LiveStatus};
use crate::models::history::{OutcomeEvent, OutcomeRecord};
use crate::monitor::detector::{classify, Verdict};
use crate::monitor::retry::{RetryEngine, RetryOutcome};
use crate::monitor::{gateway_call, MonitoringConfig};
use crate::notifier::MediaNotifier;
use crate::stores::history::OutcomeHistory;
use crate::stores::registry::TorrentRegistry;
use crate::utils::time::current_timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Tally of one monitoring cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub checked: usize,
    pub healthy: usize,
    pub stalled: usize,
    pub failed: usize,
    pub completed: usize,
    pub replaced: usize,
    pub no_alternative: usize,
    pub gateway_failed: usize,
}

struct Ticker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Everything a cycle needs; shared with the ticker task
struct CycleRunner {
    registry: Arc<TorrentRegistry>,
    gateway: Arc<dyn DownloadGateway>,
    retry: Arc<RetryEngine>,
    history: Arc<OutcomeHistory>,
    notifier: Option<Arc<dyn MediaNotifier>>,
    config: Arc<MonitoringConfig>,
    metrics: Arc<Metrics>,
    /// Held for the whole duration of a cycle
    cycle_guard: tokio::sync::Mutex<()>,
}

/// Periodic driver of refresh, classification and retry
///
/// At most one cycle runs at any time, whether it was started by the ticker
/// or by `run_once`. Stopping never interrupts a cycle in flight.
pub struct MonitoringScheduler {
    runner: Arc<CycleRunner>,
    ticker: Mutex<Option<Ticker>>,
}

impl MonitoringScheduler {
    pub fn new(
        registry: Arc<TorrentRegistry>,
        gateway: Arc<dyn DownloadGateway>,
        retry: Arc<RetryEngine>,
        history: Arc<OutcomeHistory>,
        notifier: Option<Arc<dyn MediaNotifier>>,
        config: Arc<MonitoringConfig>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            runner: Arc::new(CycleRunner {
                registry,
                gateway,
                retry,
                history,
                notifier,
                config,
                metrics,
                cycle_guard: tokio::sync::Mutex::new(()),
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.ticker.lock().as_ref() {
            Some(ticker) if !ticker.handle.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    /// Start the ticker; returns false when it was already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.ticker.lock();

        if let Some(ticker) = slot.as_ref() {
            if !ticker.handle.is_finished() {
                return false;
            }
        }

        let (stop, mut stopped) = watch::channel(false);
        let runner = Arc::clone(&self.runner);
        let period = runner.config.interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = interval.tick() => {
                        // Stop may land while the previous cycle overran the tick
                        if *stopped.borrow() {
                            break;
                        }
                        runner.run_cycle().await;
                    }
                }
            }

            debug!("Monitoring ticker exited");
        });

        *slot = Some(Ticker { stop, handle });
        info!(interval_secs = period.as_secs(), "Monitoring started");
        true
    }

    /// Signal the ticker to exit after the current cycle; returns false when already stopped
    pub fn stop(&self) -> bool {
        match self.ticker.lock().take() {
            Some(ticker) => {
                let _ = ticker.stop.send(true);
                info!("Monitoring stopped");
                true
            }
            None => false,
        }
    }

    /// Run one cycle now; `None` when a cycle was already in progress
    pub async fn run_once(&self) -> Option<CycleReport> {
        self.runner.run_cycle().await
    }

    /// Stop and wait until no cycle is running
    pub async fn teardown(&self) {
        let ticker = self.ticker.lock().take();

        if let Some(ticker) = ticker {
            let _ = ticker.stop.send(true);
            if let Err(e) = ticker.handle.await {
                error!(error = %e, "Monitoring task ended abnormally");
            }
        }

        // Waits out a run_once or a cycle from a ticker stopped earlier
        let _guard = self.runner.cycle_guard.lock().await;
        info!("Monitoring torn down");
    }
}

impl CycleRunner {
    async fn run_cycle(&self) -> Option<CycleReport> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            self.metrics.increment_skipped_cycles();
            debug!("Previous cycle still running, skipping");
            return None;
        };

        self.metrics.increment_cycles();
        let mut report = CycleReport::default();

        let identifiers = self.registry.active_identifiers();
        if identifiers.is_empty() {
            return Some(report);
        }

        let statuses = match gateway_call(self.config.gateway_timeout, self.gateway.status(&identifiers)).await {
            Ok(statuses) => statuses,
            Err(e) => {
                warn!(error = %e, tracked = identifiers.len(), "Status poll failed, skipping cycle");
                return Some(report);
            }
        };

        let mut by_hash: HashMap<String, LiveStatus> = statuses
            .into_iter()
            .map(|s| (s.info_hash.to_ascii_lowercase(), s))
            .collect();

        let now = current_timestamp();
        let mut disqualified = Vec::new();

        for id in identifiers {
            let status = by_hash.remove(&id).unwrap_or_else(|| LiveStatus::missing(&id));

            // Untracked by a handler since the snapshot was taken
            if self.registry.refresh(&id, &status, now).is_err() {
                continue;
            }
            report.checked += 1;

            if status.state == ClientState::Completed {
                if self.registry.mark_completed(&id) {
                    report.completed += 1;
                    self.on_completed(&id);
                }
                continue;
            }

            let Some(mut download) = self.registry.get(&id) else {
                continue;
            };

            let assessment = classify(&download, &self.config, now);
            self.registry.set_stall_checks(&id, assessment.stall_checks);
            download.stall_checks = assessment.stall_checks;

            match assessment.verdict {
                Verdict::Healthy => {
                    report.healthy += 1;
                    if let Some(reason) = assessment.reason {
                        debug!(
                            info_hash = %id,
                            reason = %reason,
                            stall_checks = assessment.stall_checks,
                            "Stall condition observed"
                        );
                    }
                }
                Verdict::Stalled => {
                    report.stalled += 1;
                    disqualified.push((download, Verdict::Stalled));
                }
                Verdict::Failed => {
                    report.failed += 1;
                    disqualified.push((download, Verdict::Failed));
                }
            }
        }

        for (download, verdict) in disqualified {
            match self.retry.handle_stall(&download, verdict).await {
                RetryOutcome::Replaced(_) => report.replaced += 1,
                RetryOutcome::NoAlternative => report.no_alternative += 1,
                RetryOutcome::GatewayFailed => report.gateway_failed += 1,
            }
        }

        info!(
            checked = report.checked,
            stalled = report.stalled,
            failed = report.failed,
            completed = report.completed,
            replaced = report.replaced,
            "Monitoring cycle finished"
        );

        Some(report)
    }

    fn on_completed(&self, info_hash: &str) {
        self.metrics.increment_completions();

        let Some(download) = self.registry.get(info_hash) else {
            return;
        };
        info!(info_hash = %info_hash, name = %download.name, "Download completed");

        if let Err(e) = self.history.record(OutcomeRecord::new(
            info_hash,
            &download.name,
            &download.source,
            OutcomeEvent::Completed,
            current_timestamp(),
        )) {
            error!(error = %e, "Failed to journal outcome record");
        }

        if let (Some(notifier), Some(path)) = (self.notifier.clone(), download.content_path) {
            tokio::spawn(async move {
                notifier.notify_completed(&path).await;
            });
        }
    }
}
