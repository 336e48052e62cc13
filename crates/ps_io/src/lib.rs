//! crates/ps_io/src/lib.rs
//! I/O layer: everything that touches bytes on disk.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - `table`: candidate table loading (CSV / JSON records) with row coercion.
//! - `manifest`: the JSON run manifest (offline, schema-checked).
//! - `canonical_json` / `hasher`: byte-stable artifacts and their ids.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for ps_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, ...).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON (de)serialization errors with a JSON Pointer-like location.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// CSV reader errors.
    #[error("csv error: {0}")]
    Csv(String),

    /// Required columns absent from the header. Fatal, raised before any computation.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Structural input errors (bad shape, schema violations).
    #[error("schema error at {pointer}: {msg}")]
    Schema { pointer: String, msg: String },

    /// Manifest policy / resolution errors.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Digest expectations not met.
    #[error("hash error: {0}")]
    Hash(String),

    /// Input exceeds a hard size limit.
    #[error("limit exceeded: {0}")]
    Limit(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        IoError::Csv(e.to_string())
    }
}

impl From<manifest::ManifestError> for IoError {
    fn from(e: manifest::ManifestError) -> Self {
        use manifest::ManifestError as M;
        match e {
            // Referenced file unreadable or absent: a filesystem problem, not a policy one.
            M::Io(..) | M::NotAFile(..) => IoError::Path(e.to_string()),
            other => IoError::Manifest(other.to_string()),
        }
    }
}

impl From<hasher::HashError> for IoError {
    fn from(e: hasher::HashError) -> Self {
        IoError::Hash(e.to_string())
    }
}

/* ---------------- Public modules ---------------- */

pub mod canonical_json;
pub mod hasher;
pub mod manifest;
pub mod table;

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:")
}

pub mod prelude {
    pub use crate::{looks_like_url_strict, IoError, IoResult};

    pub use crate::canonical_json::{to_canonical_bytes, write_canonical_file};
    pub use crate::hasher::sha256_hex;
    pub use crate::manifest::{load_manifest, ResolvedManifest};
    pub use crate::table::{load_table, ColumnMap, InputFormat, LoadedTable, TableSource};
}
