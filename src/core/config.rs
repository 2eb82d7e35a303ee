use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    #[serde(default)]
    pub monitoring: MonitoringSection,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    pub api_key: String,
}

/// Download client (qBittorrent Web API) connection
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringSection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_min_seeds")]
    pub min_seeds: u32,
    #[serde(default = "default_min_speed_kbps")]
    pub min_speed_kbps: u64,
    #[serde(default = "default_max_stall_checks")]
    pub max_stall_checks: u32,
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    #[serde(default)]
    pub auto_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_min_size_gb")]
    pub default_min_size_gb: f64,
    #[serde(default = "default_max_size_gb")]
    pub default_max_size_gb: f64,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,
}

/// One `[[sources]]` entry; declaration order is source priority
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for MonitoringSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            min_seeds: default_min_seeds(),
            min_speed_kbps: default_min_speed_kbps(),
            max_stall_checks: default_max_stall_checks(),
            history_len: default_history_len(),
            auto_start: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
            max_results: default_max_results(),
            default_min_size_gb: default_min_size_gb(),
            default_max_size_gb: default_max_size_gb(),
            video_extensions: default_video_extensions(),
            excluded_extensions: default_excluded_extensions(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            journal_path: default_journal_path(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            api_key: String::new(),
            timeout_secs: default_notifier_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_client_timeout() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_min_seeds() -> u32 {
    1
}

fn default_min_speed_kbps() -> u64 {
    10
}

fn default_max_stall_checks() -> u32 {
    3
}

fn default_history_len() -> usize {
    32
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_results() -> usize {
    50
}

fn default_min_size_gb() -> f64 {
    0.1
}

fn default_max_size_gb() -> f64 {
    50.0
}

fn default_video_extensions() -> Vec<String> {
    [".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_excluded_extensions() -> Vec<String> {
    [".txt", ".nfo", ".jpg", ".png", ".srt", ".sub"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("seedwatch.wal")
}

fn default_history_limit() -> usize {
    1000
}

fn default_notifier_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Sources that take part in searches, in priority order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.server.api_key.is_empty() {
            bail!("api_key must not be empty");
        }

        // Validate client config
        if !self.client.url.starts_with("http://") && !self.client.url.starts_with("https://") {
            bail!("client.url must be an http(s) URL, got '{}'", self.client.url);
        }

        if self.client.timeout_secs == 0 {
            bail!("client.timeout_secs must be greater than 0");
        }

        // Validate monitoring config
        if self.monitoring.interval_secs < 10 {
            bail!(
                "monitoring.interval_secs must be at least 10, got {}",
                self.monitoring.interval_secs
            );
        }

        if self.monitoring.max_stall_checks == 0 {
            bail!("max_stall_checks must be greater than 0");
        }

        if self.monitoring.history_len == 0 {
            bail!("history_len must be greater than 0");
        }

        // Validate search config
        if self.search.timeout_secs == 0 {
            bail!("search.timeout_secs must be greater than 0");
        }

        if self.search.max_results == 0 {
            bail!("max_results must be greater than 0");
        }

        if self.search.default_min_size_gb < 0.0 {
            bail!("default_min_size_gb must be non-negative");
        }

        if self.search.default_max_size_gb < self.search.default_min_size_gb {
            bail!(
                "default_max_size_gb ({}) must not be smaller than default_min_size_gb ({})",
                self.search.default_max_size_gb,
                self.search.default_min_size_gb
            );
        }

        // Validate sources
        for (i, source) in self.sources.iter().enumerate() {
            if source.name.trim().is_empty() {
                bail!("sources[{}].name must not be empty", i);
            }
            if self.sources[..i].iter().any(|s| s.name == source.name) {
                bail!("Duplicate source name '{}'", source.name);
            }
            if !source.url.starts_with("http://") && !source.url.starts_with("https://") {
                bail!("sources[{}].url must be an http(s) URL", i);
            }
        }

        // Validate storage config
        if self.storage.history_limit == 0 {
            bail!("history_limit must be greater than 0");
        }

        // Validate notifier config
        if self.notifier.enabled && self.notifier.url.is_empty() {
            bail!("notifier.url must be set when the notifier is enabled");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
