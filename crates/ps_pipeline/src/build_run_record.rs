//! crates/ps_pipeline/src/build_run_record.rs
//!
//! Provenance for one run: what went in (raw input digest, parameter digest),
//! what came out (result id and digest of the canonical result bytes), who
//! produced it (engine meta) and when.
//!
//! - `result_sha256` hashes the exact bytes written to `result.json`, so
//!   `sha256sum result.json` reproduces it.
//! - `id = "RUN:<timestamp>:" + sha256(canonical record without "id")`.

use ps_core::variables::Params;
use ps_io::{canonical_json, hasher};
use serde::{Deserialize, Serialize};

use crate::build_result::ResultDoc;
use crate::{EngineMeta, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecordDoc {
    pub id: String,
    /// RFC3339 UTC, seconds precision.
    pub timestamp_utc: String,
    pub engine: EngineMeta,
    pub inputs: RunInputs,
    pub outputs: RunOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInputs {
    /// Raw candidate file bytes.
    pub input_sha256: String,
    /// Canonical JSON of the parameter set.
    pub params_sha256: String,
    pub rows_read: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub result_id: String,
    pub result_sha256: String,
}

pub fn build_run_record(
    timestamp: &str,
    engine: &EngineMeta,
    input_sha256: &str,
    rows_read: usize,
    params: &Params,
    result: &ResultDoc,
) -> Result<RunRecordDoc, PipelineError> {
    let timestamp_utc = hasher::normalize_rfc3339_utc_seconds(timestamp)?;
    let result_bytes = canonical_json::to_canonical_bytes(result)?;

    let mut doc = RunRecordDoc {
        id: String::new(),
        timestamp_utc,
        engine: engine.clone(),
        inputs: RunInputs {
            input_sha256: input_sha256.to_string(),
            params_sha256: hasher::sha256_canonical(params)?,
            rows_read,
        },
        outputs: RunOutputs {
            result_id: result.id.clone(),
            result_sha256: hasher::sha256_hex(&result_bytes),
        },
    };

    let mut v = serde_json::to_value(&doc).map_err(|e| PipelineError::Build(format!("run record: {e}")))?;
    if let Some(obj) = v.as_object_mut() {
        obj.remove("id");
    }
    doc.id = hasher::run_id_from_canonical(&doc.timestamp_utc, &v)?;
    Ok(doc)
}
