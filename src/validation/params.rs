use crate::core::error::ValidationError;
use crate::models::search::{Quality, SearchRequest};
use crate::utils::magnet::{normalize_info_hash, parse_magnet};
use crate::utils::size::gb_to_bytes;
use serde::Deserialize;

const MAX_QUERY_LEN: usize = 200;
const MAX_SIZE_GB: f64 = 10_000.0;

/// Body of `POST /api/search`; sizes are in GB
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,

    /// "480p", "720p", "1080p" or "2160p"; empty means any
    #[serde(default)]
    pub quality: Option<String>,

    #[serde(default, alias = "min_size")]
    pub min_size_gb: Option<f64>,

    #[serde(default, alias = "max_size")]
    pub max_size_gb: Option<f64>,

    /// Restrict the search to these sources
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

/// Body of `POST /api/download`
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    #[serde(default, alias = "magnet", alias = "magnet_link")]
    pub locator: String,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Size in bytes, if the caller knows it
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDownload {
    pub locator: String,
    pub info_hash: String,
    pub source: String,
    pub name: String,
    pub size: u64,
    pub quality: Option<Quality>,
}

impl SearchParams {
    /// `known_sources` are the configured source names
    pub fn validate(self, known_sources: &[String]) -> Result<SearchRequest, ValidationError> {
        let query = self.validate_query()?;
        let quality = parse_quality(self.quality.as_deref())?;
        let min_size = validate_size_gb("min_size_gb", self.min_size_gb)?;
        let max_size = validate_size_gb("max_size_gb", self.max_size_gb)?;

        if let (Some(min), Some(max)) = (min_size, max_size) {
            if min > max {
                return Err(ValidationError::OutOfRange(
                    "min_size_gb must not exceed max_size_gb".to_string(),
                ));
            }
        }

        let sources = self.validate_sources(known_sources)?;

        Ok(SearchRequest {
            query,
            quality,
            min_size,
            max_size,
            sources,
            exclude: Vec::new(),
        })
    }

    fn validate_query(&self) -> Result<String, ValidationError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(ValidationError::MissingParameter("query".to_string()));
        }
        if query.chars().count() > MAX_QUERY_LEN {
            return Err(ValidationError::OutOfRange(format!(
                "query longer than {} characters",
                MAX_QUERY_LEN
            )));
        }
        Ok(query.to_string())
    }

    fn validate_sources(&self, known: &[String]) -> Result<Option<Vec<String>>, ValidationError> {
        let Some(sources) = &self.sources else {
            return Ok(None);
        };

        if sources.is_empty() {
            return Err(ValidationError::MissingParameter("sources".to_string()));
        }

        for source in sources {
            if !known.iter().any(|k| k.eq_ignore_ascii_case(source.trim())) {
                return Err(ValidationError::InvalidFormat(format!("unknown source '{}'", source)));
            }
        }

        Ok(Some(sources.iter().map(|s| s.trim().to_string()).collect()))
    }
}

impl DownloadParams {
    pub fn validate(self) -> Result<ValidatedDownload, ValidationError> {
        let locator = self.locator.trim();
        if locator.is_empty() {
            return Err(ValidationError::MissingParameter("locator".to_string()));
        }

        let magnet = parse_magnet(locator)
            .map_err(|e| ValidationError::InvalidFormat(format!("locator: {:#}", e)))?;

        let quality = parse_quality(self.quality.as_deref())?;

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or(magnet.display_name)
            .unwrap_or_else(|| magnet.info_hash.clone());

        let source = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "manual".to_string());

        Ok(ValidatedDownload {
            locator: locator.to_string(),
            info_hash: magnet.info_hash,
            source,
            name,
            size: self.size.unwrap_or(0),
            quality,
        })
    }
}

/// Normalize an identifier taken from a URL path
pub fn validate_info_hash(raw: &str) -> Result<String, ValidationError> {
    normalize_info_hash(raw).map_err(|e| ValidationError::InvalidFormat(format!("info_hash: {:#}", e)))
}

fn parse_quality(raw: Option<&str>) -> Result<Option<Quality>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(q) => q
            .parse::<Quality>()
            .map(Some)
            .map_err(ValidationError::InvalidFormat),
    }
}

fn validate_size_gb(field: &str, value: Option<f64>) -> Result<Option<u64>, ValidationError> {
    match value {
        None => Ok(None),
        Some(gb) if gb.is_finite() && (0.0..=MAX_SIZE_GB).contains(&gb) => Ok(Some(gb_to_bytes(gb))),
        Some(gb) => Err(ValidationError::OutOfRange(format!(
            "{} must be between 0 and {}, got {}",
            field, MAX_SIZE_GB, gb
        ))),
    }
}
