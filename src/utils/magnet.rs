//! Magnet URI helpers.
//!
//! The content identifier of a torrent is the lowercase hex form of its v1
//! info hash. Magnets carry it in `xt=urn:btih:` either as 40 hex characters
//! or as 32 base32 characters.

use anyhow::{bail, Context, Result};

const BTIH_PREFIX: &str = "urn:btih:";
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Magnet {
    pub info_hash: String,
    pub display_name: Option<String>,
}

/// Parse a magnet URI into its info hash and optional display name
pub fn parse_magnet(uri: &str) -> Result<Magnet> {
    let query = uri
        .strip_prefix("magnet:?")
        .context("Locator is not a magnet URI")?;

    let params: Vec<(String, String)> =
        serde_urlencoded::from_str(query).context("Malformed magnet query string")?;

    let mut info_hash = None;
    let mut display_name = None;

    for (key, value) in params {
        match key.as_str() {
            "xt" if info_hash.is_none() => {
                if let Some(raw) = value.strip_prefix(BTIH_PREFIX) {
                    info_hash = Some(normalize_info_hash(raw)?);
                }
            }
            "dn" if display_name.is_none() && !value.trim().is_empty() => {
                display_name = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    let info_hash = info_hash.context("Magnet URI has no btih exact topic")?;

    Ok(Magnet {
        info_hash,
        display_name,
    })
}

/// Content identifier of a magnet, `None` for anything unparseable
pub fn info_hash_of(locator: &str) -> Option<String> {
    parse_magnet(locator).ok().map(|magnet| magnet.info_hash)
}

/// Accepts 40 hex or 32 base32 characters and returns lowercase hex
pub fn normalize_info_hash(raw: &str) -> Result<String> {
    let raw = raw.trim();

    match raw.len() {
        40 => {
            let bytes = hex::decode(raw).context("Invalid hex info hash")?;
            Ok(hex::encode(bytes))
        }
        32 => {
            let bytes = decode_base32(raw)?;
            Ok(hex::encode(bytes))
        }
        other => bail!("Info hash must be 40 hex or 32 base32 characters, got {}", other),
    }
}

fn decode_base32(input: &str) -> Result<[u8; 20]> {
    let mut out = [0u8; 20];
    let mut buffer: u64 = 0;
    let mut bits = 0u32;
    let mut index = 0usize;

    for ch in input.bytes() {
        let value = BASE32_ALPHABET
            .iter()
            .position(|&c| c == ch.to_ascii_uppercase())
            .context("Invalid base32 character in info hash")? as u64;

        buffer = (buffer << 5) | value;
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            out[index] = (buffer >> bits) as u8;
            index += 1;
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(out)
}
