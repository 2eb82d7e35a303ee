//! In-memory doubles for the gateway, providers and notifier.

use crate::core::config::Config;
use crate::core::error::{GatewayError, ProviderError};
use crate::core::state::AppState;
use crate::gateway::DownloadGateway;
use crate::models::download::{ClientState, ContentFile, LiveStatus};
use crate::models::search::{Quality, SearchResult};
use crate::notifier::MediaNotifier;
use crate::providers::SourceProvider;
use crate::wal::wal::Wal;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub fn create_test_config() -> Config {
    Config::parse(
        r#"
        [server]
        port = 8080
        api_key = "test_api_key"

        [client]
        url = "http://127.0.0.1:8081"
        username = "admin"
        password = "adminadmin"

        [[sources]]
        name = "a"
        url = "http://127.0.0.1:9001/search"

        [logging]
        format = "console"
        "#,
    )
    .unwrap()
}

/// Full application state over a temp journal and a [`MockGateway`]
///
/// Keep the returned `TempDir` alive for as long as the state is used.
pub fn create_test_state(
    providers: Vec<Arc<dyn SourceProvider>>,
) -> (Arc<AppState>, Arc<MockGateway>, TempDir) {
    let dir = TempDir::new().unwrap();
    let wal = Wal::new(dir.path().join("test.wal")).unwrap();
    let gateway = Arc::new(MockGateway::new());

    let state = AppState::new(
        create_test_config(),
        wal,
        Arc::clone(&gateway) as Arc<dyn DownloadGateway>,
        providers,
        None,
    );

    (Arc::new(state), gateway, dir)
}

/// Candidate whose identifier is `c` repeated 40 times
pub fn result(c: char, title: &str, size: u64, seeds: u32, source: &str) -> SearchResult {
    let info_hash = c.to_string().repeat(40);
    SearchResult {
        title: title.to_string(),
        locator: format!("magnet:?xt=urn:btih:{}&dn={}", info_hash, title.replace(' ', "+")),
        info_hash,
        size,
        seeds,
        leechers: 0,
        quality: Quality::detect(title),
        source: source.to_string(),
        files: Vec::new(),
    }
}

pub fn live(c: char, state: ClientState, downloaded: u64, speed: u64, seeds: u32) -> LiveStatus {
    LiveStatus {
        info_hash: c.to_string().repeat(40),
        name: format!("Download {}", c),
        size: 2 * 1_073_741_824,
        downloaded,
        speed,
        seeds,
        leechers: 0,
        state,
        content_path: Some(format!("/downloads/{}", c)),
        source: None,
    }
}

pub struct StaticProvider {
    name: String,
    results: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new(name: &str, results: Vec<SearchResult>) -> Self {
        Self {
            name: name.to_string(),
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SourceProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, text: &str, _limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        self.queries.lock().push(text.to_string());
        Ok(self.results.clone())
    }
}

pub struct FailingProvider {
    name: String,
}

impl FailingProvider {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

#[async_trait]
impl SourceProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _text: &str, _limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

pub struct SlowProvider {
    name: String,
    delay: Duration,
}

impl SlowProvider {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl SourceProvider for SlowProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, text: &str, _limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![result('f', text, 1_073_741_824, 1_000, &self.name)])
    }
}

/// Download client kept in a map; submissions start downloading immediately
pub struct MockGateway {
    torrents: Mutex<HashMap<String, LiveStatus>>,
    submitted: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
    files: Mutex<HashMap<String, Vec<ContentFile>>>,
    priorities: Mutex<Vec<(String, Vec<usize>, u8)>>,
    fail_submit: AtomicBool,
    fail_status: AtomicBool,
    status_delay: Duration,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            torrents: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            priorities: Mutex::new(Vec::new()),
            fail_submit: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
            status_delay: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn insert(&self, status: LiveStatus) {
        self.torrents.lock().insert(status.info_hash.clone(), status);
    }

    pub fn update(&self, c: char, apply: impl FnOnce(&mut LiveStatus)) {
        if let Some(status) = self.torrents.lock().get_mut(&c.to_string().repeat(40)) {
            apply(status);
        }
    }

    /// Payload reported for `info_hash` once its metadata is known
    pub fn set_files(&self, info_hash: &str, files: Vec<ContentFile>) {
        self.files.lock().insert(info_hash.to_string(), files);
    }

    pub fn priorities(&self) -> Vec<(String, Vec<usize>, u8)> {
        self.priorities.lock().clone()
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DownloadGateway for MockGateway {
    async fn submit(&self, locator: &str, source: &str) -> Result<String, GatewayError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(GatewayError::SubmitFailed("Fails.".to_string()));
        }

        let info_hash = locator
            .split("urn:btih:")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| GatewayError::SubmitFailed("not a magnet".to_string()))?
            .to_ascii_lowercase();

        self.submitted.lock().push(locator.to_string());
        self.insert(LiveStatus {
            info_hash: info_hash.clone(),
            name: format!("Submitted {}", &info_hash[..1]),
            size: 2 * 1_073_741_824,
            downloaded: 0,
            speed: 512 * 1024,
            seeds: 50,
            leechers: 0,
            state: ClientState::Downloading,
            content_path: None,
            source: Some(source.to_string()),
        });

        Ok(info_hash)
    }

    async fn status(&self, identifiers: &[String]) -> Result<Vec<LiveStatus>, GatewayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_status.load(Ordering::SeqCst) {
            return Err(GatewayError::StatusUnavailable("HTTP 503".to_string()));
        }

        let torrents = self.torrents.lock();
        Ok(identifiers
            .iter()
            .filter_map(|id| torrents.get(id).cloned())
            .collect())
    }

    async fn remove(&self, identifier: &str, _delete_files: bool) -> Result<(), GatewayError> {
        self.removed.lock().push(identifier.to_string());
        self.torrents.lock().remove(identifier);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LiveStatus>, GatewayError> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(GatewayError::StatusUnavailable("HTTP 503".to_string()));
        }

        let mut all: Vec<LiveStatus> = self.torrents.lock().values().cloned().collect();
        all.sort_by(|a, b| a.info_hash.cmp(&b.info_hash));
        Ok(all)
    }

    async fn files(&self, identifier: &str) -> Result<Vec<ContentFile>, GatewayError> {
        Ok(self.files.lock().get(identifier).cloned().unwrap_or_default())
    }

    async fn set_file_priority(&self, identifier: &str, indexes: &[usize], priority: u8) -> Result<(), GatewayError> {
        self.priorities
            .lock()
            .push((identifier.to_string(), indexes.to_vec(), priority));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    paths: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

#[async_trait]
impl MediaNotifier for RecordingNotifier {
    async fn notify_completed(&self, content_path: &str) {
        self.paths.lock().push(content_path.to_string());
    }
}

/// Decode a handler response body
pub async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Payload file at position `index`, downloaded at normal priority
pub fn content_file(index: usize, name: &str) -> ContentFile {
    ContentFile {
        index,
        name: name.to_string(),
        size: 1_024,
        priority: 1,
    }
}
