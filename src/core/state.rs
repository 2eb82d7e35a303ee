// Application state (AppState)

use crate::core::config::Config;
use crate::gateway::DownloadGateway;
use crate::metrics::collector::Metrics;
use crate::monitor::retry::RetryEngine;
use crate::monitor::scheduler::MonitoringScheduler;
use crate::monitor::MonitoringConfig;
use crate::notifier::MediaNotifier;
use crate::providers::SourceProvider;
use crate::search::aggregator::SearchAggregator;
use crate::stores::{blacklist::BlacklistStore, history::OutcomeHistory, registry::TorrentRegistry};
use crate::wal::wal::Wal;
use std::sync::Arc;

/// Shared application state
///
/// Owns the engine components and the scheduler. Everything is behind an
/// Arc so handlers and the ticker task share the same instances.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Tuning knobs derived from `config`
    pub monitoring: Arc<MonitoringConfig>,

    pub registry: Arc<TorrentRegistry>,

    /// Durable, journaled
    pub blacklist: Arc<BlacklistStore>,

    /// Durable, journaled
    pub history: Arc<OutcomeHistory>,

    pub aggregator: Arc<SearchAggregator>,

    pub gateway: Arc<dyn DownloadGateway>,

    pub scheduler: Arc<MonitoringScheduler>,

    pub metrics: Arc<Metrics>,

    pub wal: Arc<Wal>,
}

impl AppState {
    pub fn new(
        config: Config,
        wal: Wal,
        gateway: Arc<dyn DownloadGateway>,
        providers: Vec<Arc<dyn SourceProvider>>,
        notifier: Option<Arc<dyn MediaNotifier>>,
    ) -> Self {
        let config = Arc::new(config);
        let monitoring = Arc::new(MonitoringConfig::from_config(&config));
        let wal = Arc::new(wal);
        let metrics = Arc::new(Metrics::new());

        let registry = Arc::new(TorrentRegistry::new(monitoring.history_len));
        let blacklist = Arc::new(BlacklistStore::new(Arc::clone(&wal)));
        let history = Arc::new(OutcomeHistory::new(
            config.storage.history_limit,
            Arc::clone(&wal),
        ));

        let aggregator = Arc::new(SearchAggregator::new(
            providers,
            Arc::clone(&blacklist),
            Arc::clone(&monitoring),
            Arc::clone(&metrics),
        ));

        let retry = Arc::new(RetryEngine::new(
            Arc::clone(&registry),
            Arc::clone(&blacklist),
            Arc::clone(&history),
            Arc::clone(&aggregator),
            Arc::clone(&gateway),
            Arc::clone(&monitoring),
            Arc::clone(&metrics),
        ));

        let scheduler = Arc::new(MonitoringScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&gateway),
            retry,
            Arc::clone(&history),
            notifier,
            Arc::clone(&monitoring),
            Arc::clone(&metrics),
        ));

        Self {
            config,
            monitoring,
            registry,
            blacklist,
            history,
            aggregator,
            gateway,
            scheduler,
            metrics,
            wal,
        }
    }
}
