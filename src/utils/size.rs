use regex::Regex;
use std::sync::LazyLock;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;
const TIB: f64 = GIB * 1024.0;

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(TIB|TB|GIB|GB|MIB|MB|KIB|KB|B)\b")
        .expect("size pattern is valid")
});

/// Parse a human readable size such as "1.5 GB" or "700 MiB" into bytes
///
/// Units are binary regardless of the `i`. Returns `None` when no size is found.
pub fn parse_size(text: &str) -> Option<u64> {
    let captures = SIZE_PATTERN.captures(text)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let multiplier = match captures.get(2)?.as_str().to_ascii_uppercase().as_str() {
        "TB" | "TIB" => TIB,
        "GB" | "GIB" => GIB,
        "MB" | "MIB" => MIB,
        "KB" | "KIB" => KIB,
        _ => 1.0,
    };

    Some((value * multiplier).round() as u64)
}

pub fn gb_to_bytes(gb: f64) -> u64 {
    if gb.is_finite() && gb > 0.0 {
        (gb * GIB).round() as u64
    } else if gb.is_infinite() && gb > 0.0 {
        u64::MAX
    } else {
        0
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / GIB
}
