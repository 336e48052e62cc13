//! ps_report/src/lib.rs: Pure offline report model + renderers (JSON/HTML/CSV/text).
//!
//! Determinism rules:
//! - No network, no I/O here. Callers supply artifacts already in memory.
//! - No recomputation: every figure is echoed from `result.json` / `run_record.json`.
//! - Stable section order and field names. Money and life values show two
//!   decimals; ratios and per-project gains show six.
//!
//! Inputs are accepted as JSON values (`serde_json::Value`) so this crate does
//! not depend on the pipeline's concrete document types.

#![forbid(unsafe_code)]

use ps_core::ids::{ResultId, RunId};
use serde::Serialize;
use serde_json::Value;

#[cfg(feature = "render_csv")]
pub mod render_csv;
#[cfg(feature = "render_html")]
pub mod render_html;
#[cfg(feature = "render_json")]
pub mod render_json;
pub mod render_text;

pub type ResultArtifact = Value;
pub type RunRecordArtifact = Value;

// ===== Errors =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    MissingField(&'static str),
    Inconsistent(&'static str),
    Render(String),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::MissingField(p) => write!(f, "artifact is missing {p}"),
            ReportError::Inconsistent(m) => write!(f, "artifacts disagree: {m}"),
            ReportError::Render(m) => write!(f, "render failed: {m}"),
        }
    }
}
impl std::error::Error for ReportError {}

// ===== Model =====

#[derive(Clone, Debug, Serialize)]
pub struct ReportModel {
    pub cover: SectionCover,
    pub optimal: AllocationSection,
    pub ranked: Vec<RankedSection>,
    pub search: SectionSearch,
    pub diagnostics: Vec<DiagnosticLine>,
    pub integrity: SectionIntegrity,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionCover {
    pub title: String,
    pub baseline_life: f64,
    pub budget: f64,
    pub scale: u64,
    pub top_n: u64,
    pub max_steps: Option<u64>,
    pub candidates: u64,
    pub groups: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AllocationSection {
    pub delta_total: f64,
    pub cost_total: f64,
    pub life_total: f64,
    pub ratio: f64,
    pub member_ids: Vec<String>,
    pub details: Vec<DetailLine>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedSection {
    pub rank: u64,
    #[serde(flatten)]
    pub allocation: AllocationSection,
}

#[derive(Clone, Debug, Serialize)]
pub struct DetailLine {
    pub id: String,
    pub group_key: String,
    pub life_value: f64,
    pub delta_life: f64,
    pub cost: f64,
    pub attributes: Vec<(String, String)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionSearch {
    pub truncated: bool,
    pub steps: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiagnosticLine {
    pub severity: String,
    pub code: String,
    #[serde(rename = "where")]
    pub where_: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionIntegrity {
    pub result_id: String,
    pub run_id: String,
    pub timestamp_utc: String,
    pub engine_vendor: String,
    pub engine_name: String,
    pub engine_version: String,
    pub engine_build: String,
    pub input_sha256: String,
    pub params_sha256: String,
    pub result_sha256: String,
}

// ===== API =====

/// Build the report model from artifacts (pure, offline).
///
/// Missing required fields yield `ReportError::MissingField`; a run record
/// that points at a different result yields `ReportError::Inconsistent`.
pub fn build_model(result: &ResultArtifact, run: &RunRecordArtifact) -> Result<ReportModel, ReportError> {
    // ---- Cover ----
    let cover = SectionCover {
        title: "Project Portfolio Selection".to_string(),
        baseline_life: need_f64(result, "/params/baseline_life")?,
        budget: need_f64(result, "/params/budget")?,
        scale: need_u64(result, "/params/scale")?,
        top_n: need_u64(result, "/params/top_n")?,
        max_steps: j_u64(result, "/params/max_steps"),
        candidates: j_u64(result, "/candidates").unwrap_or(0),
        groups: j_u64(result, "/groups").unwrap_or(0),
    };

    // ---- Allocations ----
    let optimal = map_allocation(result.pointer("/optimal").ok_or(ReportError::MissingField("/optimal"))?)?;
    let ranked = result
        .pointer("/ranked")
        .and_then(Value::as_array)
        .ok_or(ReportError::MissingField("/ranked"))?
        .iter()
        .map(|r| {
            Ok(RankedSection {
                rank: need_u64(r, "/rank")?,
                allocation: map_allocation(r)?,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    let search = SectionSearch {
        truncated: result.pointer("/truncated").and_then(Value::as_bool).unwrap_or(false),
        steps: j_u64(result, "/steps").unwrap_or(0),
    };

    let diagnostics = result
        .pointer("/issues")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .map(|i| DiagnosticLine {
                    severity: j_str(i, "/severity").unwrap_or_default(),
                    code: j_str(i, "/code").unwrap_or_default(),
                    where_: j_str(i, "/where").unwrap_or_default(),
                    message: j_str(i, "/message").unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    // ---- Integrity ----
    let result_id = need_str(result, "/id")?;
    if result_id.parse::<ResultId>().is_err() {
        return Err(ReportError::Inconsistent("result id is not RES:<sha256>"));
    }
    let run_id = need_str(run, "/id")?;
    if run_id.parse::<RunId>().is_err() {
        return Err(ReportError::Inconsistent("run id is not RUN:<timestamp>:<sha256>"));
    }
    if need_str(run, "/outputs/result_id")? != result_id {
        return Err(ReportError::Inconsistent("run record points at a different result"));
    }
    let integrity = SectionIntegrity {
        result_id,
        run_id,
        timestamp_utc: need_str(run, "/timestamp_utc")?,
        engine_vendor: j_str(run, "/engine/vendor").unwrap_or_else(|| "ps".into()),
        engine_name: j_str(run, "/engine/name").unwrap_or_else(|| "ps_engine".into()),
        engine_version: j_str(run, "/engine/version").unwrap_or_else(|| "unknown".into()),
        engine_build: j_str(run, "/engine/build").unwrap_or_else(|| "unknown".into()),
        input_sha256: need_str(run, "/inputs/input_sha256")?,
        params_sha256: need_str(run, "/inputs/params_sha256")?,
        result_sha256: need_str(run, "/outputs/result_sha256")?,
    };

    Ok(ReportModel { cover, optimal, ranked, search, diagnostics, integrity })
}

fn map_allocation(v: &Value) -> Result<AllocationSection, ReportError> {
    let member_ids = v
        .pointer("/member_ids")
        .and_then(Value::as_array)
        .ok_or(ReportError::MissingField("member_ids"))?
        .iter()
        .filter_map(|x| x.as_str().map(str::to_string))
        .collect();
    let details = v
        .pointer("/details")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(map_detail).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    Ok(AllocationSection {
        delta_total: need_f64(v, "/delta_total")?,
        cost_total: need_f64(v, "/cost_total")?,
        life_total: need_f64(v, "/life_total")?,
        ratio: j_f64(v, "/ratio").unwrap_or(0.0),
        member_ids,
        details,
    })
}

fn map_detail(v: &Value) -> Result<DetailLine, ReportError> {
    let attributes = v
        .pointer("/attributes")
        .and_then(Value::as_array)
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|p| {
                    let name = p.get(0)?.as_str()?;
                    Some((name.to_string(), p.get(1).map(cell_to_string).unwrap_or_default()))
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(DetailLine {
        id: need_str(v, "/id")?,
        group_key: j_str(v, "/group_key").unwrap_or_default(),
        life_value: need_f64(v, "/life_value")?,
        delta_life: need_f64(v, "/delta_life")?,
        cost: need_f64(v, "/cost")?,
        attributes,
    })
}

impl ReportModel {
    /// Attribute names across every detail row, first-seen order.
    pub fn attribute_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = Vec::new();
        let all = self.optimal.details.iter().chain(self.ranked.iter().flat_map(|r| r.allocation.details.iter()));
        for d in all {
            for (name, _) in &d.attributes {
                if !cols.iter().any(|c| c == name) {
                    cols.push(name.clone());
                }
            }
        }
        cols
    }
}

// ===== Helpers =====

/// Two decimals; never prints `-0.00`.
pub fn fmt_2dp(x: f64) -> String {
    if !x.is_finite() {
        return "-".to_string();
    }
    let s = format!("{x:.2}");
    if s == "-0.00" {
        "0.00".to_string()
    } else {
        s
    }
}

/// Six decimals, for ratios and per-project gains that live well below 0.01.
pub fn fmt_6dp(x: f64) -> String {
    if !x.is_finite() {
        return "-".to_string();
    }
    let s = format!("{x:.6}");
    if s == "-0.000000" {
        "0.000000".to_string()
    } else {
        s
    }
}

pub fn j_str(v: &Value, ptr: &str) -> Option<String> {
    v.pointer(ptr).and_then(Value::as_str).map(str::to_string)
}

pub fn j_u64(v: &Value, ptr: &str) -> Option<u64> {
    v.pointer(ptr).and_then(Value::as_u64)
}

pub fn j_f64(v: &Value, ptr: &str) -> Option<f64> {
    v.pointer(ptr).and_then(json_number_to_f64)
}

/// Number or numeric string.
#[inline]
pub fn json_number_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn need_str(v: &Value, ptr: &'static str) -> Result<String, ReportError> {
    j_str(v, ptr).ok_or(ReportError::MissingField(ptr))
}

fn need_u64(v: &Value, ptr: &'static str) -> Result<u64, ReportError> {
    j_u64(v, ptr).ok_or(ReportError::MissingField(ptr))
}

fn need_f64(v: &Value, ptr: &'static str) -> Result<f64, ReportError> {
    j_f64(v, ptr).ok_or(ReportError::MissingField(ptr))
}

fn cell_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub const RES: &str = "RES:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    pub const RUN: &str =
        "RUN:2025-08-12T10:00:00Z:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    pub fn result() -> Value {
        let detail = |id: &str, g: &str, life: f64, cost: f64, tipo: &str| {
            json!({ "id": id, "group_key": g, "life_value": life, "delta_life": life - 70.0,
                    "cost": cost, "attributes": [["Tipo", tipo]] })
        };
        let a = detail("P1", "Puente <Norte>", 75.0, 1000.0, "Puente");
        let b = detail("P2", "Via", 72.5, 500.0, "Via & Anden");
        json!({
            "id": RES,
            "params": { "baseline_life": 70.0, "budget": 1500.0, "scale": 1, "top_n": 2 },
            "candidates": 3,
            "groups": 2,
            "optimal": { "delta_total": 7.5, "cost_total": 1500.0, "life_total": 147.5, "cost_units": 1500,
                         "ratio": 0.005, "member_ids": ["P1", "P2"], "details": [a.clone(), b.clone()] },
            "ranked": [
                { "rank": 1, "delta_total": 7.5, "cost_total": 1500.0, "life_total": 147.5, "cost_units": 1500,
                  "ratio": 0.005, "member_ids": ["P1", "P2"], "details": [a.clone(), b] },
                { "rank": 2, "delta_total": 5.0, "cost_total": 1000.0, "life_total": 75.0, "cost_units": 1000,
                  "ratio": 0.005, "member_ids": ["P1"], "details": [a] }
            ],
            "truncated": false,
            "steps": 9,
            "issues": [ { "severity": "warning", "code": "Row.ValueCoerced", "where": "row 3",
                          "message": "vida: \"n/a\" is not a number; using 0" } ]
        })
    }

    pub fn run() -> Value {
        json!({
            "id": RUN,
            "timestamp_utc": "2025-08-12T10:00:00Z",
            "engine": { "vendor": "ps", "name": "ps_engine", "version": "0.1.0", "build": "dev" },
            "inputs": { "input_sha256": "c".repeat(64), "params_sha256": "d".repeat(64), "rows_read": 3 },
            "outputs": { "result_id": RES, "result_sha256": "e".repeat(64) }
        })
    }
}
