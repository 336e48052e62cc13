//! render_csv.rs: tabular exports of the report model.
//!
//! Produces, in this order:
//! - `ranked_summary.csv`: one line per ranked allocation
//! - `optimal_details.csv`: detail rows of the optimum
//! - `rank_<n>_details.csv`: detail rows of each ranked allocation
//!
//! Money and life carry two decimals, ratios and gains six. Attribute
//! columns follow first-seen order
//! across the whole report so every detail file shares one header.

use crate::{fmt_2dp, fmt_6dp, DetailLine, ReportError, ReportModel};

pub const RANKED_SUMMARY: &str = "ranked_summary.csv";
pub const OPTIMAL_DETAILS: &str = "optimal_details.csv";

/// Member ids inside a single CSV cell.
const MEMBER_SEPARATOR: &str = " | ";

/// `(file name, file contents)` pairs ready to be written side by side.
pub fn render_csv(m: &ReportModel, delimiter: u8) -> Result<Vec<(String, String)>, ReportError> {
    let attrs = m.attribute_columns();
    let mut out = Vec::with_capacity(2 + m.ranked.len());

    out.push((RANKED_SUMMARY.to_string(), ranked_summary(m, delimiter)?));
    out.push((OPTIMAL_DETAILS.to_string(), details(&m.optimal.details, &attrs, delimiter)?));
    for r in &m.ranked {
        out.push((format!("rank_{}_details.csv", r.rank), details(&r.allocation.details, &attrs, delimiter)?));
    }
    Ok(out)
}

fn ranked_summary(m: &ReportModel, delimiter: u8) -> Result<String, ReportError> {
    let mut w = writer(delimiter);
    w.write_record(["rank", "delta_total", "cost_total", "life_total", "ratio", "member_ids"])
        .map_err(csv_err)?;
    for r in &m.ranked {
        let a = &r.allocation;
        w.write_record([
            r.rank.to_string(),
            fmt_2dp(a.delta_total),
            fmt_2dp(a.cost_total),
            fmt_2dp(a.life_total),
            fmt_6dp(a.ratio),
            a.member_ids.join(MEMBER_SEPARATOR),
        ])
        .map_err(csv_err)?;
    }
    finish(w)
}

fn details(rows: &[DetailLine], attrs: &[String], delimiter: u8) -> Result<String, ReportError> {
    let mut w = writer(delimiter);
    let mut header: Vec<&str> = vec!["id", "group_key", "life_value", "delta_life", "cost"];
    header.extend(attrs.iter().map(String::as_str));
    w.write_record(&header).map_err(csv_err)?;

    for d in rows {
        let mut rec = vec![
            d.id.clone(),
            d.group_key.clone(),
            fmt_2dp(d.life_value),
            fmt_6dp(d.delta_life),
            fmt_2dp(d.cost),
        ];
        for a in attrs {
            rec.push(d.attributes.iter().find(|(k, _)| k == a).map(|(_, v)| v.clone()).unwrap_or_default());
        }
        w.write_record(&rec).map_err(csv_err)?;
    }
    finish(w)
}

fn writer(delimiter: u8) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(w: csv::Writer<Vec<u8>>) -> Result<String, ReportError> {
    let bytes = w.into_inner().map_err(|e| ReportError::Render(format!("csv: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Render(format!("csv: {e}")))
}

fn csv_err(e: csv::Error) -> ReportError {
    ReportError::Render(format!("csv: {e}"))
}
