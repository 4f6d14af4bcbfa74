//! Payload decoding for archive entries
//!
//! Databricks archives store notebooks as JSON, but exports seen in the wild
//! also wrap that JSON in base64 and/or gzip/zlib compression. Decoding is an
//! ordered list of attempts; the first one that yields a JSON value wins.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use serde_json::Value;
use std::io::Read;

/// Upper bound on the size of a decompressed payload.
pub const MAX_DECODED_SIZE: u64 = crate::MAX_ENTRY_SIZE;

/// Base64 engine that tolerates non-zero trailing bits.
///
/// Input is stripped of non-alphabet bytes before it reaches the engine, so
/// line-wrapped base64 decodes as well.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Which decoding produced the JSON payload of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    /// Plain UTF-8 JSON
    Json,
    /// Base64-wrapped JSON
    Base64Json,
    /// Base64-wrapped gzip-compressed JSON
    Base64Gzip,
    /// Base64-wrapped zlib-compressed JSON
    Base64Zlib,
    /// Gzip-compressed JSON
    Gzip,
    /// Zlib-compressed JSON
    Zlib,
}

impl std::fmt::Display for PayloadFormat {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Base64Json => "base64+json",
            Self::Base64Gzip => "base64+gzip",
            Self::Base64Zlib => "base64+zlib",
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
        };
        write!(f, "{s}")
    }
}

type Attempt = fn(&[u8], u64) -> Option<Value>;

/// Attempts applied to the base64-decoded bytes, in order.
const BASE64_ATTEMPTS: [(PayloadFormat, Attempt); 3] = [
    (PayloadFormat::Base64Json, parse_json),
    (PayloadFormat::Base64Gzip, parse_gzip),
    (PayloadFormat::Base64Zlib, parse_zlib),
];

/// Attempts applied to the raw bytes once base64 has been ruled out.
const RAW_COMPRESSED_ATTEMPTS: [(PayloadFormat, Attempt); 2] = [
    (PayloadFormat::Gzip, parse_gzip),
    (PayloadFormat::Zlib, parse_zlib),
];

/// Decode an entry payload into a JSON value.
///
/// Returns `None` when no decoding applies; callers treat the entry as plain
/// text in that case.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<Value> {
    decode_with_format(bytes).map(|(_, value)| value)
}

/// Decode an entry payload, reporting which decoding succeeded.
#[must_use]
pub fn decode_with_format(bytes: &[u8]) -> Option<(PayloadFormat, Value)> {
    decode_with_limit(bytes, MAX_DECODED_SIZE)
}

/// Decode an entry payload with an explicit cap on decompressed size.
///
/// Decompressed output larger than `limit` bytes counts as a failed attempt.
#[must_use]
pub fn decode_with_limit(bytes: &[u8], limit: u64) -> Option<(PayloadFormat, Value)> {
    if let Some(value) = parse_json(bytes, limit) {
        return Some((PayloadFormat::Json, value));
    }

    if let Some(decoded) = decode_base64(bytes) {
        for (format, attempt) in BASE64_ATTEMPTS {
            if let Some(value) = attempt(&decoded, limit) {
                return Some((format, value));
            }
        }
    }

    RAW_COMPRESSED_ATTEMPTS
        .iter()
        .find_map(|(format, attempt)| attempt(bytes, limit).map(|value| (*format, value)))
}

fn parse_json(bytes: &[u8], _limit: u64) -> Option<Value> {
    serde_json::from_slice(bytes).ok()
}

fn parse_gzip(bytes: &[u8], limit: u64) -> Option<Value> {
    let inflated = read_limited(MultiGzDecoder::new(bytes), limit)?;
    serde_json::from_slice(&inflated).ok()
}

fn parse_zlib(bytes: &[u8], limit: u64) -> Option<Value> {
    let inflated = read_limited(ZlibDecoder::new(bytes), limit)?;
    serde_json::from_slice(&inflated).ok()
}

/// Read a decompressor to the end, giving up past `limit` bytes.
fn read_limited<R: Read>(reader: R, limit: u64) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .ok()?;
    if out.len() as u64 > limit {
        log::debug!("Decompressed payload exceeds {limit} bytes, skipping");
        return None;
    }
    Some(out)
}

/// Base64-decode after dropping every byte outside the standard alphabet.
///
/// Input ends with the first quad that carries padding; anything after it is
/// ignored.
fn decode_base64(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut filtered: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect();
    if let Some(pad) = filtered.iter().position(|&b| b == b'=') {
        filtered.truncate((pad / 4 + 1) * 4);
    }
    LENIENT_BASE64.decode(filtered).ok()
}
