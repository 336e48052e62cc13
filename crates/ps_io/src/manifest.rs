//! Run manifest: one JSON file naming the candidate file, how to read it, and
//! the full parameter set.
//!
//! - Offline only: any path with a scheme (`://`, `http:`, `https:`) is rejected.
//! - `candidates_path` is relative to the manifest's directory unless absolute.
//! - The raw JSON is checked against `schemas/manifest.schema.json` (feature
//!   `schemaval`) before typed decoding.
//! - `expect.input_sha256`, when present, is compared against the SHA-256 of
//!   the raw candidate bytes once they are loaded.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use ps_core::variables::Params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hasher::is_sha256_hex;
use crate::table::{ColumnMap, InputFormat, TableSource};
use crate::{looks_like_url_strict, IoError, IoResult};

const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

#[cfg(feature = "schemaval")]
const MANIFEST_SCHEMA: &str = include_str!("../schemas/manifest.schema.json");

fn default_delimiter() -> String {
    ";".to_string()
}

/// External manifest as written by users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Free-form label; not used by any artifact.
    #[serde(default)]
    pub id: Option<String>,
    pub candidates_path: String,
    #[serde(default)]
    pub format: InputFormat,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub columns: ColumnMap,
    pub params: Params,
    #[serde(default)]
    pub display_columns: Option<Vec<String>>,
    #[serde(default)]
    pub expect: Option<Expectations>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    /// Lowercase 64-hex digest of the raw candidate file.
    #[serde(default)]
    pub input_sha256: Option<String>,
}

/// Manifest with its path resolved and every field checked.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub candidates_path: PathBuf,
    pub source: TableSource,
    pub columns: ColumnMap,
    pub params: Params,
    pub display_columns: Option<Vec<String>>,
    pub expect: Expectations,
}

impl ResolvedManifest {
    /// Compare the loaded input digest with `expect.input_sha256`, if set.
    pub fn verify_input_sha256(&self, actual: &str) -> Result<(), ManifestError> {
        match &self.expect.input_sha256 {
            Some(want) if want != actual => Err(ManifestError::DigestMismatch(
                "candidates_path",
                format!("expected={want} got={actual}"),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum ManifestError {
    Empty(&'static str),
    UrlPath(&'static str, String),
    Io(&'static str, String),
    NotAFile(&'static str, String),
    Delimiter(String),
    DigestShape(&'static str, String),
    DigestMismatch(&'static str, String),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ManifestError::*;
        match self {
            Empty(k) => write!(f, "field must not be empty: {k}"),
            UrlPath(k, v) => write!(f, "path must be offline (no scheme) for {k}: {v}"),
            Io(k, v) => write!(f, "cannot access {k}: {v}"),
            NotAFile(k, v) => write!(f, "path is not a file for {k}: {v}"),
            Delimiter(v) => write!(f, "delimiter must be a single ASCII character or \\t: {v:?}"),
            DigestShape(k, v) => write!(f, "invalid sha256 format for {k}: {v}"),
            DigestMismatch(k, v) => write!(f, "sha256 mismatch for {k}: {v}"),
        }
    }
}
impl std::error::Error for ManifestError {}

/* ---------------------------------- helpers ---------------------------------- */

/// A single ASCII character, or `\t` / `tab`.
pub fn parse_delimiter(s: &str) -> Option<u8> {
    match s {
        "\\t" | "tab" | "\t" => Some(b'\t'),
        _ => {
            let b = s.as_bytes();
            (b.len() == 1 && b[0].is_ascii() && b[0] != b'"' && b[0] != b'\n').then(|| b[0])
        }
    }
}

#[inline]
fn join_under(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn must_exist_file(label: &'static str, p: &Path) -> Result<(), ManifestError> {
    let md = fs::metadata(p).map_err(|e| ManifestError::Io(label, format!("{} ({e})", p.display())))?;
    if !md.is_file() {
        return Err(ManifestError::NotAFile(label, p.display().to_string()));
    }
    Ok(())
}

/* --------------------------------- validation --------------------------------- */

/// Shape and offline checks. No I/O.
pub fn validate_manifest(man: &Manifest) -> Result<(), ManifestError> {
    if man.candidates_path.trim().is_empty() {
        return Err(ManifestError::Empty("candidates_path"));
    }
    if looks_like_url_strict(&man.candidates_path) {
        return Err(ManifestError::UrlPath("candidates_path", man.candidates_path.clone()));
    }
    if parse_delimiter(&man.delimiter).is_none() {
        return Err(ManifestError::Delimiter(man.delimiter.clone()));
    }
    for (label, v) in [
        ("columns.id", &man.columns.id),
        ("columns.group", &man.columns.group),
        ("columns.life", &man.columns.life),
        ("columns.cost", &man.columns.cost),
    ] {
        if v.trim().is_empty() {
            return Err(ManifestError::Empty(label));
        }
    }
    if let Some(h) = &man.expect.as_ref().and_then(|e| e.input_sha256.clone()) {
        if !is_sha256_hex(h) {
            return Err(ManifestError::DigestShape("expect.input_sha256", h.clone()));
        }
    }
    Ok(())
}

/// Resolve `candidates_path` under `base_dir` and require it to be a file.
pub fn resolve_manifest(base_dir: &Path, man: Manifest) -> Result<ResolvedManifest, ManifestError> {
    validate_manifest(&man)?;
    let candidates_path = join_under(base_dir, &man.candidates_path);
    must_exist_file("candidates_path", &candidates_path)?;
    let delimiter = parse_delimiter(&man.delimiter).ok_or_else(|| ManifestError::Delimiter(man.delimiter.clone()))?;

    Ok(ResolvedManifest {
        candidates_path,
        source: TableSource { format: man.format, delimiter },
        columns: man.columns,
        params: man.params,
        display_columns: man.display_columns,
        expect: man.expect.unwrap_or_default(),
    })
}

#[cfg(feature = "schemaval")]
fn check_schema(v: &Value) -> IoResult<()> {
    let schema: Value = serde_json::from_str(MANIFEST_SCHEMA)?;
    let compiled = jsonschema::JSONSchema::options()
        .with_draft(jsonschema::Draft::Draft7)
        .compile(&schema)
        .map_err(|e| IoError::Schema { pointer: "#".into(), msg: e.to_string() })?;
    let result = compiled.validate(v);
    if let Err(mut errors) = result {
        if let Some(first) = errors.next() {
            return Err(IoError::Schema {
                pointer: first.instance_path.to_string(),
                msg: first.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(not(feature = "schemaval"))]
fn check_schema(_v: &Value) -> IoResult<()> {
    Ok(())
}

/* ---------------------------------- entry ---------------------------------- */

/// Parse, schema-check, validate and resolve a manifest relative to `base_dir`.
pub fn parse_manifest(bytes: &[u8], base_dir: &Path) -> IoResult<ResolvedManifest> {
    let v: Value = serde_json::from_slice(bytes)?;
    check_schema(&v)?;
    let man: Manifest = serde_json::from_value(v)?;
    Ok(resolve_manifest(base_dir, man)?)
}

/// Load a manifest file; relative paths inside resolve against its directory.
pub fn load_manifest(path: &Path) -> IoResult<ResolvedManifest> {
    if looks_like_url_strict(&path.to_string_lossy()) {
        return Err(ManifestError::UrlPath("manifest", path.display().to_string()).into());
    }
    let f = fs::File::open(path).map_err(|e| IoError::Path(format!("{} ({e})", path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_MANIFEST_BYTES + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > MAX_MANIFEST_BYTES {
        return Err(IoError::Limit(format!("manifest larger than {MAX_MANIFEST_BYTES} bytes")));
    }
    let base = path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    parse_manifest(&buf, &base)
}
