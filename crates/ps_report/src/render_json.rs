//! render_json.rs
//! Report JSON renderer (cover → optimal → ranked → search → diagnostics → integrity).
//!
//! Key order is the insertion order of `serde_json::Map`, which needs the
//! `preserve_order` feature enabled in this crate's manifest.

use serde_json::{Map as JsonMap, Value};

use crate::{AllocationSection, DetailLine, ReportModel, SectionCover, SectionIntegrity};

/// Build the top-level report object in section order.
pub fn render_report_json(m: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("cover".into(), cover_json(&m.cover));
    root.insert("optimal".into(), allocation_json(&m.optimal));
    root.insert(
        "ranked".into(),
        Value::Array(
            m.ranked
                .iter()
                .map(|r| {
                    let mut o = obj();
                    o.insert("rank".into(), Value::from(r.rank));
                    if let Value::Object(rest) = allocation_json(&r.allocation) {
                        o.extend(rest);
                    }
                    Value::Object(o)
                })
                .collect(),
        ),
    );

    let mut s = obj();
    s.insert("truncated".into(), Value::Bool(m.search.truncated));
    s.insert("steps".into(), Value::from(m.search.steps));
    root.insert("search".into(), Value::Object(s));

    root.insert(
        "diagnostics".into(),
        Value::Array(
            m.diagnostics
                .iter()
                .map(|d| {
                    let mut o = obj();
                    o.insert("severity".into(), Value::String(d.severity.clone()));
                    o.insert("code".into(), Value::String(d.code.clone()));
                    o.insert("where".into(), Value::String(d.where_.clone()));
                    o.insert("message".into(), Value::String(d.message.clone()));
                    Value::Object(o)
                })
                .collect(),
        ),
    );
    root.insert("integrity".into(), integrity_json(&m.integrity));
    Value::Object(root)
}

/// Pretty string form of [`render_report_json`], newline-terminated.
pub fn render_report_json_string(m: &ReportModel) -> String {
    let mut s = serde_json::to_string_pretty(&render_report_json(m)).unwrap_or_else(|_| "{}".to_string());
    s.push('\n');
    s
}

/* ----------------------- sections ----------------------- */

fn cover_json(c: &SectionCover) -> Value {
    let mut o = obj();
    o.insert("title".into(), Value::String(c.title.clone()));
    let mut p = obj();
    p.insert("baseline_life".into(), num(c.baseline_life));
    p.insert("budget".into(), num(c.budget));
    p.insert("scale".into(), Value::from(c.scale));
    p.insert("top_n".into(), Value::from(c.top_n));
    if let Some(ms) = c.max_steps {
        p.insert("max_steps".into(), Value::from(ms));
    }
    o.insert("params".into(), Value::Object(p));
    o.insert("candidates".into(), Value::from(c.candidates));
    o.insert("groups".into(), Value::from(c.groups));
    Value::Object(o)
}

fn allocation_json(a: &AllocationSection) -> Value {
    let mut o = obj();
    o.insert("delta_total".into(), num(a.delta_total));
    o.insert("cost_total".into(), num(a.cost_total));
    o.insert("life_total".into(), num(a.life_total));
    o.insert("ratio".into(), num(a.ratio));
    o.insert(
        "member_ids".into(),
        Value::Array(a.member_ids.iter().cloned().map(Value::String).collect()),
    );
    o.insert("details".into(), Value::Array(a.details.iter().map(detail_json).collect()));
    Value::Object(o)
}

fn detail_json(d: &DetailLine) -> Value {
    let mut o = obj();
    o.insert("id".into(), Value::String(d.id.clone()));
    o.insert("group_key".into(), Value::String(d.group_key.clone()));
    o.insert("life_value".into(), num(d.life_value));
    o.insert("delta_life".into(), num(d.delta_life));
    o.insert("cost".into(), num(d.cost));
    // Attributes keep their column order, so an object is fine here.
    let mut attrs = obj();
    for (k, v) in &d.attributes {
        attrs.insert(k.clone(), Value::String(v.clone()));
    }
    o.insert("attributes".into(), Value::Object(attrs));
    Value::Object(o)
}

fn integrity_json(i: &SectionIntegrity) -> Value {
    let mut o = obj();
    o.insert("result_id".into(), Value::String(i.result_id.clone()));
    o.insert("run_id".into(), Value::String(i.run_id.clone()));
    o.insert("timestamp_utc".into(), Value::String(i.timestamp_utc.clone()));

    let mut e = obj();
    e.insert("vendor".into(), Value::String(i.engine_vendor.clone()));
    e.insert("name".into(), Value::String(i.engine_name.clone()));
    e.insert("version".into(), Value::String(i.engine_version.clone()));
    e.insert("build".into(), Value::String(i.engine_build.clone()));
    o.insert("engine".into(), Value::Object(e));

    o.insert("input_sha256".into(), Value::String(i.input_sha256.clone()));
    o.insert("params_sha256".into(), Value::String(i.params_sha256.clone()));
    o.insert("result_sha256".into(), Value::String(i.result_sha256.clone()));
    Value::Object(o)
}

/* ----------------------- helpers ----------------------- */

#[inline]
fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}

/// Non-finite numbers have no JSON form; they become `null`.
#[inline]
fn num(x: f64) -> Value {
    serde_json::Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
}
