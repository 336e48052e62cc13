//! crates/ps_io/src/hasher.rs
//!
//! Deterministic hashing and ID builders for canonical artifacts.
//!
//! - Canonical JSON hashing: sorted object keys, array order preserved.
//! - `RES:<hex>` derives from the canonical result payload (without its id).
//! - `RUN:<timestamp>:<hex>` combines an RFC3339-UTC timestamp with the hash
//!   of the canonical run-record payload (without its id).
//! - Hex digests are **lowercase**.
//!
//! Use `sha256_canonical(..)` for JSON values/structs and `sha256_hex(..)` for
//! raw bytes (candidate files are hashed as read, not re-serialized).

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical_json::to_canonical_json_bytes;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("JSON serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid timestamp (expected RFC3339 UTC like 2025-08-12T10:00:00Z): {0}")]
    InvalidTimestamp(String),
}

/* ---------------------------- Canonical hashing ---------------------------- */

fn to_canon_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    let v = serde_json::to_value(value)?;
    Ok(to_canonical_json_bytes(&v)?)
}

/// SHA-256 over **canonical JSON bytes** of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, HashError> {
    Ok(sha256_hex(&to_canon_bytes(value)?))
}

/* ------------------------------- Raw hashing ------------------------------- */

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Lowercase 64-hex check.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/* ---------------------------- Artifact ID builders ---------------------------- */

/// `RES:<hex>` for the result payload.
pub fn res_id_from_canonical<T: Serialize>(value: &T) -> Result<String, HashError> {
    Ok(format!("RES:{}", sha256_canonical(value)?))
}

/// Normalize a timestamp to RFC3339 UTC seconds with trailing `Z`.
/// Accepts `YYYY-MM-DDTHH:MM:SS`, optional `.fraction`, then `Z`, `+00:00` or `-00:00`.
pub fn normalize_rfc3339_utc_seconds(ts: &str) -> Result<String, HashError> {
    let bad = || HashError::InvalidTimestamp(ts.to_string());
    let b = ts.as_bytes();
    if b.len() < 20 {
        return Err(bad());
    }
    let num = |r: std::ops::Range<usize>| -> Result<u32, HashError> {
        let s = ts.get(r).ok_or_else(bad)?;
        if !s.bytes().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        s.parse::<u32>().map_err(|_| bad())
    };
    if b[4] != b'-' || b[7] != b'-' || b[10] != b'T' || b[13] != b':' || b[16] != b':' {
        return Err(bad());
    }
    let (y, m, d) = (num(0..4)?, num(5..7)?, num(8..10)?);
    let (hh, mm, ss) = (num(11..13)?, num(14..16)?, num(17..19)?);
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || hh > 23 || mm > 59 || ss > 59 {
        return Err(bad());
    }

    let mut idx = 19;
    if b.get(idx) == Some(&b'.') {
        idx += 1;
        let start = idx;
        while idx < b.len() && b[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == start || idx - start > 9 {
            return Err(bad());
        }
    }
    match ts.get(idx..) {
        Some("Z" | "+00:00" | "-00:00") => {}
        _ => return Err(bad()),
    }

    Ok(format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}Z"))
}

/// `RUN:<timestamp>:<hex>` for the run record.
pub fn run_id_from_canonical<T: Serialize>(
    timestamp_utc: &str,
    run_value: &T,
) -> Result<String, HashError> {
    let ts = normalize_rfc3339_utc_seconds(timestamp_utc)?;
    Ok(format!("RUN:{ts}:{}", sha256_hex(&to_canon_bytes(run_value)?)))
}
