//! Plain-text console summary: optimal block, ranked table, and the detail
//! rows of the first few ranks.

use std::fmt::Write as _;

use crate::{fmt_2dp, fmt_6dp, AllocationSection, DetailLine, ReportModel};

/// Ranks whose detail rows are printed.
pub const DETAIL_RANKS: usize = 5;

pub fn render_text(m: &ReportModel) -> String {
    let mut s = String::with_capacity(4 * 1024);

    let _ = writeln!(s, "== Optimal allocation ==");
    optimal_block(&mut s, &m.optimal);

    let _ = writeln!(s);
    let _ = writeln!(s, "== Top {} allocations ==", m.ranked.len());
    if m.search.truncated {
        let _ = writeln!(s, "(search stopped after {} steps)", m.search.steps);
    }
    let _ = writeln!(
        s,
        "{:>4}  {:>12}  {:>14}  {:>12}  {:>10}  members",
        "rank", "delta", "cost", "life", "ratio"
    );
    for r in &m.ranked {
        let a = &r.allocation;
        let _ = writeln!(
            s,
            "{:>4}  {:>12}  {:>14}  {:>12}  {:>10}  {}",
            r.rank,
            fmt_2dp(a.delta_total),
            fmt_2dp(a.cost_total),
            fmt_2dp(a.life_total),
            fmt_6dp(a.ratio),
            members(&a.member_ids)
        );
    }

    for r in m.ranked.iter().take(DETAIL_RANKS) {
        let _ = writeln!(s);
        let _ = writeln!(s, "-- rank {} details --", r.rank);
        detail_rows(&mut s, &r.allocation.details);
    }

    let warnings = m.diagnostics.iter().filter(|d| d.severity != "info").count();
    if warnings > 0 {
        let _ = writeln!(s);
        let _ = writeln!(s, "{warnings} diagnostic(s); see result.json");
    }
    s
}

fn optimal_block(s: &mut String, a: &AllocationSection) {
    let _ = writeln!(s, "delta_total: {}", fmt_2dp(a.delta_total));
    let _ = writeln!(s, "cost_total:  {}", fmt_2dp(a.cost_total));
    let _ = writeln!(s, "life_total:  {}", fmt_2dp(a.life_total));
    let _ = writeln!(s, "members:     {}", members(&a.member_ids));
}

fn detail_rows(s: &mut String, rows: &[DetailLine]) {
    if rows.is_empty() {
        let _ = writeln!(s, "(no projects)");
        return;
    }
    let _ = writeln!(s, "{:<16}  {:<24}  {:>8}  {:>10}  {:>14}", "id", "group", "life", "gain", "cost");
    for d in rows {
        let _ = writeln!(
            s,
            "{:<16}  {:<24}  {:>8}  {:>10}  {:>14}",
            d.id,
            d.group_key,
            fmt_2dp(d.life_value),
            fmt_6dp(d.delta_life),
            fmt_2dp(d.cost)
        );
    }
}

fn members(ids: &[String]) -> String {
    if ids.is_empty() {
        "(none)".to_string()
    } else {
        ids.join(", ")
    }
}
