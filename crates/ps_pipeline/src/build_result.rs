//! crates/ps_pipeline/src/build_result.rs
//! Assemble `result.json` from the solver outputs and give it its content id.
//!
//! `id = "RES:" + sha256(canonical JSON of the document without "id")`.
//! Nothing here recomputes totals; they come from the `Allocation`s.

use ps_algo::{DetailReport, DetailRow};
use ps_core::diagnostics::Issue;
use ps_core::entities::{Allocation, RankedResult};
use ps_core::variables::Params;
use ps_io::hasher;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDoc {
    pub id: String,
    pub params: Params,
    pub candidates: usize,
    pub groups: usize,
    pub optimal: AllocationDoc,
    pub ranked: Vec<RankedDoc>,
    pub truncated: bool,
    pub steps: u64,
    pub issues: Vec<IssueDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationDoc {
    pub delta_total: f64,
    pub cost_total: f64,
    pub life_total: f64,
    pub cost_units: u64,
    pub ratio: f64,
    pub member_ids: Vec<String>,
    pub details: Vec<DetailDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDoc {
    /// 1-based.
    pub rank: usize,
    #[serde(flatten)]
    pub allocation: AllocationDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailDoc {
    pub id: String,
    pub group_key: String,
    pub life_value: f64,
    pub delta_life: f64,
    pub cost: f64,
    /// `[name, value]` pairs in display order.
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDoc {
    pub severity: String,
    pub code: String,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: String,
}

impl From<&Issue> for IssueDoc {
    fn from(i: &Issue) -> Self {
        Self {
            severity: i.severity.as_str().to_string(),
            code: i.code.to_string(),
            message: i.message.clone(),
            where_: i.where_.to_string(),
        }
    }
}

impl From<&DetailRow> for DetailDoc {
    fn from(r: &DetailRow) -> Self {
        Self {
            id: r.id.to_string(),
            group_key: r.group_key.to_string(),
            life_value: r.life_value,
            delta_life: r.delta_life,
            cost: r.cost,
            attributes: r.attributes.iter().map(|a| (a.name.clone(), a.value.clone())).collect(),
        }
    }
}

pub fn allocation_doc(a: &Allocation, details: &DetailReport) -> AllocationDoc {
    AllocationDoc {
        delta_total: a.delta_total(),
        cost_total: a.cost_total(),
        life_total: a.life_total(),
        cost_units: a.cost_units(),
        ratio: a.ratio(),
        member_ids: a.member_ids().iter().map(ToString::to_string).collect(),
        details: details.rows.iter().map(DetailDoc::from).collect(),
    }
}

/// Everything the result document is made from.
pub struct ResultInputs<'a> {
    pub params: &'a Params,
    pub candidates: usize,
    pub groups: usize,
    pub optimal: (&'a Allocation, &'a DetailReport),
    pub ranked: &'a RankedResult,
    /// Same length and order as `ranked.entries`.
    pub ranked_details: &'a [DetailReport],
    pub issues: &'a [Issue],
}

/// Build the document and stamp its `RES:` id.
pub fn build_result(inp: ResultInputs<'_>) -> Result<ResultDoc, PipelineError> {
    if inp.ranked_details.len() != inp.ranked.entries.len() {
        return Err(PipelineError::Build(format!(
            "ranked details mismatch: {} entries, {} detail reports",
            inp.ranked.entries.len(),
            inp.ranked_details.len()
        )));
    }

    let ranked = inp
        .ranked
        .entries
        .iter()
        .zip(inp.ranked_details)
        .enumerate()
        .map(|(i, (a, d))| RankedDoc { rank: i + 1, allocation: allocation_doc(a, d) })
        .collect();

    let mut doc = ResultDoc {
        id: String::new(),
        params: inp.params.clone(),
        candidates: inp.candidates,
        groups: inp.groups,
        optimal: allocation_doc(inp.optimal.0, inp.optimal.1),
        ranked,
        truncated: inp.ranked.truncated,
        steps: inp.ranked.steps,
        issues: inp.issues.iter().map(IssueDoc::from).collect(),
    };
    doc.id = result_id(&doc)?;
    Ok(doc)
}

/// `RES:<hex>` over the document with its `id` field removed.
pub fn result_id(doc: &ResultDoc) -> Result<String, PipelineError> {
    let mut v = serde_json::to_value(doc).map_err(|e| PipelineError::Build(format!("result: {e}")))?;
    if let Some(obj) = v.as_object_mut() {
        obj.remove("id");
    }
    Ok(hasher::res_id_from_canonical(&v)?)
}
