//! ps_pipeline: deterministic pipeline surface
//! (load → validate → partition → select → enumerate → detail → build).
//!
//! All file access, JSON shape and hashing go through `ps_io`; all math goes
//! through `ps_algo`. Writing artifacts to disk is left to the caller.

#![forbid(unsafe_code)]

use std::path::Path;

use ps_algo::{enumerate_top_n, expand_allocation, partition_groups, select_optimal, DetailReport};
use ps_core::diagnostics::{codes, EntityRef, Issue};
use ps_core::errors::CoreError;
use ps_core::variables::Params;
use ps_io::hasher::HashError;
use ps_io::manifest::load_manifest;
use ps_io::table::{load_table, ColumnMap, LoadedTable, TableSource};
use ps_io::IoError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod build_result;
pub mod build_run_record;
pub mod validate;

pub use build_result::{AllocationDoc, DetailDoc, IssueDoc, RankedDoc, ResultDoc};
pub use build_run_record::{RunInputs, RunOutputs, RunRecordDoc};
pub use validate::ValidationReport;

/// Used unless the caller supplies a timestamp, so reruns stay byte-identical.
pub const DEFAULT_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    pub vendor: String,
    pub name: String,
    pub version: String,
    pub build: String,
}

/// Everything a run needs, already loaded.
#[derive(Debug, Clone)]
pub struct PipelineCtx {
    pub loaded: LoadedTable,
    pub params: Params,
    pub display_columns: Option<Vec<String>>,
    pub engine_meta: EngineMeta,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub result: ResultDoc,
    pub run_record: RunRecordDoc,
}

/// Single error surface for orchestration, bucketed for exit-code mapping.
#[derive(Debug)]
pub enum PipelineError {
    Io(String),
    Schema(String),
    Validate(String),
    /// Parameter or size domain violated.
    Domain(String),
    /// Declared input digest does not match.
    Verify(String),
    Build(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use PipelineError::*;
        match self {
            Io(m) => write!(f, "io: {m}"),
            Schema(m) => write!(f, "schema: {m}"),
            Validate(m) => write!(f, "validate: {m}"),
            Domain(m) => write!(f, "domain: {m}"),
            Verify(m) => write!(f, "verify: {m}"),
            Build(m) => write!(f, "build: {m}"),
        }
    }
}
impl std::error::Error for PipelineError {}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        use PipelineError::*;
        match e {
            IoError::Schema { pointer, msg } => Schema(format!("{pointer}: {msg}")),
            IoError::Json { pointer, msg } => Schema(format!("json {pointer}: {msg}")),
            IoError::Csv(m) => Schema(format!("csv: {m}")),
            IoError::MissingColumns(cols) => Schema(format!("missing required column(s): {}", cols.join(", "))),
            IoError::Manifest(m) => Validate(format!("manifest: {m}")),
            IoError::Hash(m) => Build(format!("hash: {m}")),
            IoError::Path(m) => Io(format!("path: {m}")),
            IoError::Limit(m) => Io(format!("limit: {m}")),
        }
    }
}

impl From<CoreError> for PipelineError {
    fn from(e: CoreError) -> Self {
        PipelineError::Domain(e.to_string())
    }
}

impl From<HashError> for PipelineError {
    fn from(e: HashError) -> Self {
        PipelineError::Build(format!("hash: {e}"))
    }
}

/* ----------------------------------- Loading ----------------------------------- */

/// Load the candidate file named by a manifest and check its declared digest.
pub fn ctx_from_manifest_path(path: &Path) -> Result<PipelineCtx, PipelineError> {
    let man = load_manifest(path)?;
    let loaded = load_table(&man.candidates_path, &man.source, &man.columns)?;
    man.verify_input_sha256(&loaded.input_sha256)
        .map_err(|e| PipelineError::Verify(e.to_string()))?;
    Ok(PipelineCtx {
        loaded,
        params: man.params,
        display_columns: man.display_columns,
        engine_meta: engine_identifiers(),
        timestamp: DEFAULT_TIMESTAMP.to_string(),
    })
}

/// Load a candidate file directly with explicit settings.
pub fn ctx_from_source(
    candidates: &Path,
    source: &TableSource,
    columns: &ColumnMap,
    params: Params,
    display_columns: Option<Vec<String>>,
) -> Result<PipelineCtx, PipelineError> {
    let loaded = load_table(candidates, source, columns)?;
    Ok(PipelineCtx {
        loaded,
        params,
        display_columns,
        engine_meta: engine_identifiers(),
        timestamp: DEFAULT_TIMESTAMP.to_string(),
    })
}

/* ----------------------------------- Running ----------------------------------- */

/// Row findings from loading plus the pre-computation checks.
pub fn validate_only(ctx: &PipelineCtx) -> ValidationReport {
    let table = &ctx.loaded.table;
    let groups = partition_groups(table);
    let mut report = validate::validate(table, &groups, &ctx.params);
    let mut issues = ctx.loaded.issues.clone();
    issues.append(&mut report.issues);
    report.issues = issues;
    report
}

/// Orchestrate a full run over a preloaded context.
pub fn run_with_ctx(ctx: PipelineCtx) -> Result<PipelineOutputs, PipelineError> {
    let PipelineCtx { loaded, params, display_columns, engine_meta, timestamp } = ctx;
    let table = &loaded.table;

    // --- PARTITION + VALIDATE ---
    let groups = partition_groups(table);
    info!(
        candidates = table.len(),
        groups = groups.len(),
        budget_units = params.budget_units(),
        "input partitioned"
    );
    let report = validate::validate(table, &groups, &params);
    if !report.pass {
        let summary = validate::error_summary(&report);
        return Err(if report.issues.iter().any(|i| i.code == codes::PARAM_DOMAIN) {
            PipelineError::Domain(summary)
        } else {
            PipelineError::Validate(summary)
        });
    }

    // --- SELECT + ENUMERATE ---
    let optimal = select_optimal(table, &groups, &params).map_err(|e| PipelineError::Domain(e.to_string()))?;
    info!(
        delta_total = optimal.delta_total(),
        cost_units = optimal.cost_units(),
        members = optimal.len(),
        "optimal allocation selected"
    );
    let ranked = enumerate_top_n(table, &groups, &params);
    info!(kept = ranked.len(), steps = ranked.steps, truncated = ranked.truncated, "ranked allocations enumerated");

    // --- DETAIL ---
    let display = display_columns.as_deref();
    let optimal_detail = expand_allocation(table, optimal.member_ids(), params.baseline_life, display);
    let ranked_details: Vec<DetailReport> = ranked
        .entries
        .iter()
        .map(|a| expand_allocation(table, a.member_ids(), params.baseline_life, display))
        .collect();

    // --- ISSUES (load order, then checks, then run findings) ---
    let mut issues = loaded.issues.clone();
    issues.extend(report.issues);
    issues.extend(optimal_detail.issues.iter().cloned());
    for d in &ranked_details {
        issues.extend(d.issues.iter().cloned());
    }
    if ranked.truncated {
        issues.push(Issue::warning(
            codes::SEARCH_TRUNCATED,
            EntityRef::Param("max_steps"),
            format!("search stopped after {} steps; ranking covers the allocations seen so far", ranked.steps),
        ));
    }

    // --- BUILD ---
    let result = build_result::build_result(build_result::ResultInputs {
        params: &params,
        candidates: table.len(),
        groups: groups.len(),
        optimal: (&optimal, &optimal_detail),
        ranked: &ranked,
        ranked_details: &ranked_details,
        issues: &issues,
    })?;
    let run_record = build_run_record::build_run_record(
        &timestamp,
        &engine_meta,
        &loaded.input_sha256,
        loaded.rows_read,
        &params,
        &result,
    )?;
    debug!(result_id = %result.id, run_id = %run_record.id, "artifacts built");

    Ok(PipelineOutputs { result, run_record })
}

/// Convenience entry: manifest → load → run, with the default timestamp.
pub fn run_from_manifest_path<P: AsRef<Path>>(path: P) -> Result<PipelineOutputs, PipelineError> {
    run_with_ctx(ctx_from_manifest_path(path.as_ref())?)
}

/// Engine identifiers recorded in every run record.
pub fn engine_identifiers() -> EngineMeta {
    EngineMeta {
        vendor: "ps".to_string(),
        name: "ps_engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: if cfg!(debug_assertions) { "dev" } else { "release" }.to_string(),
    }
}
