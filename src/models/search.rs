use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared video quality of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
    #[serde(rename = "2160p")]
    Uhd2160,
}

impl Quality {
    /// Highest resolution first, so "1080p HD" is not mistaken for 720p
    const DETECTION_ORDER: [Quality; 4] = [
        Quality::Uhd2160,
        Quality::FullHd1080,
        Quality::Hd720,
        Quality::Sd480,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Sd480 => "480p",
            Quality::Hd720 => "720p",
            Quality::FullHd1080 => "1080p",
            Quality::Uhd2160 => "2160p",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Quality::Sd480 => &["480p", "SD"],
            Quality::Hd720 => &["720p", "HD", "HDTV"],
            Quality::FullHd1080 => &["1080p", "FHD", "Full HD", "FullHD"],
            Quality::Uhd2160 => &["2160p", "4K", "UHD"],
        }
    }

    /// Whether any keyword of this quality appears as a whole token run in `title`
    pub fn matches_title(self, title: &str) -> bool {
        let haystack = normalize_tokens(title);
        self.keywords()
            .iter()
            .any(|keyword| haystack.contains(&normalize_tokens(keyword)))
    }

    pub fn detect(title: &str) -> Option<Quality> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|quality| quality.matches_title(title))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "480p" | "sd" => Ok(Quality::Sd480),
            "720p" | "hd" => Ok(Quality::Hd720),
            "1080p" | "fhd" => Ok(Quality::FullHd1080),
            "2160p" | "4k" | "uhd" => Ok(Quality::Uhd2160),
            other => Err(format!("unknown quality '{}'", other)),
        }
    }
}

/// Lowercases and turns every run of non-alphanumerics into a single space,
/// padded so that `contains(" kw ")` only matches whole tokens.
fn normalize_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

/// A candidate produced by a provider query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    /// Magnet URI or other locator the download client accepts
    pub locator: String,
    pub info_hash: String,
    /// Size in bytes
    pub size: u64,
    pub seeds: u32,
    pub leechers: u32,
    pub quality: Option<Quality>,
    pub source: String,
    /// File names inside the torrent; empty when the provider does not expose them
    #[serde(default)]
    pub files: Vec<String>,
}

/// Parameters for one aggregated search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub quality: Option<Quality>,
    /// Lower size bound in bytes; the configured default applies when `None`
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    /// Sources to query; every allowed source when `None`
    pub sources: Option<Vec<String>>,
    /// Identifiers to leave out on top of the blacklist
    pub exclude: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_quality(mut self, quality: Option<Quality>) -> Self {
        self.quality = quality;
        self
    }
}
