//! Source provider for search endpoints that answer with JSON.
//!
//! The endpoint is called as `GET {url}?q={query}&limit={n}` and may return
//! either a bare array of records or an object with a `results` array. Field
//! names follow the common indexer spellings (`title`/`name`,
//! `magnet`/`magnet_link`, `seeds`/`seeders`, ...).

use crate::core::config::SourceConfig;
use crate::core::error::ProviderError;
use crate::models::search::{Quality, SearchResult};
use crate::providers::SourceProvider;
use crate::utils::magnet::{info_hash_of, normalize_info_hash};
use crate::utils::size::parse_size;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct HttpJsonProvider {
    name: String,
    url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    List(Vec<RawRecord>),
    Wrapped { results: Vec<RawRecord> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(u64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn as_count(&self) -> Option<u64> {
        match self {
            RawNumber::Int(n) => Some(*n),
            RawNumber::Float(f) if *f >= 0.0 => Some(*f as u64),
            RawNumber::Float(_) => None,
            RawNumber::Text(s) => s.trim().replace(',', "").parse().ok(),
        }
    }

    fn as_bytes(&self) -> Option<u64> {
        match self {
            RawNumber::Text(s) => parse_size(s).or_else(|| s.trim().parse().ok()),
            other => other.as_count(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "name")]
    title: String,
    #[serde(default, alias = "magnet", alias = "magnet_link")]
    locator: Option<String>,
    #[serde(default, alias = "hash")]
    info_hash: Option<String>,
    #[serde(default)]
    size: Option<RawNumber>,
    #[serde(default, alias = "seeders")]
    seeds: Option<RawNumber>,
    #[serde(default, alias = "leeches")]
    leechers: Option<RawNumber>,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    files: Vec<String>,
}

impl RawRecord {
    /// `None` when no content identifier can be derived
    fn into_result(self, source: &str) -> Option<SearchResult> {
        let info_hash = match &self.info_hash {
            Some(raw) => normalize_info_hash(raw).ok(),
            None => None,
        }
        .or_else(|| self.locator.as_deref().and_then(info_hash_of))?;

        let locator = match self.locator {
            Some(locator) if !locator.trim().is_empty() => locator,
            _ => build_magnet(&info_hash, &self.title),
        };

        let quality = self
            .quality
            .as_deref()
            .and_then(|q| q.parse::<Quality>().ok())
            .or_else(|| Quality::detect(&self.title));

        let count = |n: &Option<RawNumber>| {
            n.as_ref()
                .and_then(RawNumber::as_count)
                .map(|c| c.min(u32::MAX as u64) as u32)
                .unwrap_or(0)
        };

        Some(SearchResult {
            seeds: count(&self.seeds),
            leechers: count(&self.leechers),
            size: self.size.as_ref().and_then(RawNumber::as_bytes).unwrap_or(0),
            title: self.title,
            locator,
            info_hash,
            quality,
            source: source.to_string(),
            files: self.files,
        })
    }
}

fn build_magnet(info_hash: &str, title: &str) -> String {
    match serde_urlencoded::to_string([("dn", title)]) {
        Ok(dn) => format!("magnet:?xt=urn:btih:{}&{}", info_hash, dn),
        Err(_) => format!("magnet:?xt=urn:btih:{}", info_hash),
    }
}

impl HttpJsonProvider {
    pub fn new(source: &SourceConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            name: source.name.clone(),
            url: source.url.clone(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl SourceProvider for HttpJsonProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", text.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", response.status())));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let records = match serde_json::from_slice::<RawResponse>(&body)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?
        {
            RawResponse::List(records) | RawResponse::Wrapped { results: records } => records,
        };

        let total = records.len();
        let results: Vec<SearchResult> = records
            .into_iter()
            .filter_map(|record| record.into_result(&self.name))
            .take(limit)
            .collect();

        debug!(
            source = %self.name,
            query = %text,
            total = total,
            usable = results.len(),
            "Provider records mapped"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    const HASH: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/search", addr)
    }

    fn provider(url: String, timeout: Duration) -> HttpJsonProvider {
        HttpJsonProvider::new(
            &SourceConfig {
                name: "json".to_string(),
                url,
                enabled: true,
            },
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_maps_array_records() {
        let router = Router::new().route(
            "/search",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("q").map(String::as_str), Some("Some Movie"));
                Json(json!([
                    {
                        "name": "Some.Movie.2020.1080p.WEB",
                        "magnet": format!("magnet:?xt=urn:btih:{}", HASH),
                        "size": "1.5 GB",
                        "seeders": "1,204",
                        "leechers": 7
                    },
                    {
                        "title": "Some Movie 2020",
                        "hash": "ZHQVOY7XELZD5GFCTXWN7LRUDOMNKMCW",
                        "size": 734003200,
                        "seeds": 3,
                        "quality": "720p",
                        "files": ["Some Movie.mkv"]
                    },
                    { "title": "No identifier at all", "seeds": 99 }
                ]))
            }),
        );
        let provider = provider(spawn(router).await, Duration::from_secs(5));

        let results = provider.query("Some Movie", 10).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].info_hash, HASH);
        assert_eq!(results[0].size, 1_610_612_736);
        assert_eq!(results[0].seeds, 1204);
        assert_eq!(results[0].leechers, 7);
        assert_eq!(results[0].quality, Some(Quality::FullHd1080));
        assert_eq!(results[0].source, "json");

        assert_eq!(results[1].info_hash, HASH);
        assert!(results[1].locator.starts_with(&format!("magnet:?xt=urn:btih:{}&dn=", HASH)));
        assert_eq!(results[1].quality, Some(Quality::Hd720));
        assert_eq!(results[1].files, vec!["Some Movie.mkv".to_string()]);
    }

    #[tokio::test]
    async fn test_wrapped_results_and_limit() {
        let router = Router::new().route(
            "/search",
            get(|| async {
                let results: Vec<Value> = (0..5)
                    .map(|i| json!({ "title": format!("R{}", i), "info_hash": format!("{:040x}", i) }))
                    .collect();
                Json(json!({ "results": results }))
            }),
        );
        let provider = provider(spawn(router).await, Duration::from_secs(5));

        let results = provider.query("x", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].title, "R2");
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let router = Router::new().route("/search", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let provider = provider(spawn(router).await, Duration::from_secs(5));

        let err = provider.query("x", 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let router = Router::new().route("/search", get(|| async { "<html>captcha</html>" }));
        let provider = provider(spawn(router).await, Duration::from_secs(5));

        let err = provider.query("x", 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let router = Router::new().route(
            "/search",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        );
        let provider = provider(spawn(router).await, Duration::from_millis(100));

        let err = provider.query("x", 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }
}
