//! crates/ps_pipeline/src/validate.rs
//! Structural & semantic checks before any DP or search.
//! Deterministic: same table + params ⇒ same report, byte for byte.

use ps_algo::{estimate_search_space, Group};
use ps_core::diagnostics::{codes, passes, EntityRef, Issue, Severity};
use ps_core::entities::CandidateTable;
use ps_core::scaling::to_units;
use ps_core::variables::Params;

/// Above this many leaves an unbounded top-N search gets a warning.
pub const SEARCH_LARGE_THRESHOLD: u64 = 10_000_000;

/// Over-budget candidates named individually before the message switches to a count.
const OVER_BUDGET_LISTED: usize = 5;

/// pass = no Error-severity issue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<Issue>,
}

/// Top-level entry point.
pub fn validate(table: &CandidateTable, groups: &[Group], params: &Params) -> ValidationReport {
    let mut issues = Vec::new();

    if table.is_empty() {
        issues.push(Issue::error(codes::INPUT_EMPTY, EntityRef::Root, "candidate table has no rows"));
    }

    if let Err(e) = params.validate_domains() {
        issues.push(Issue::error(codes::PARAM_DOMAIN, EntityRef::Root, e.to_string()));
    } else {
        issues.extend(check_budget_fit(table, params));
        issues.extend(check_search_size(groups, params));
    }

    sort_issues_stably(&mut issues);
    ValidationReport { pass: passes(&issues), issues }
}

/// `Candidate.OverBudget` for items no allocation can hold; `Budget.Infeasible`
/// when that is every item.
fn check_budget_fit(table: &CandidateTable, params: &Params) -> Vec<Issue> {
    let cap = params.budget_units();
    let over: Vec<_> = table.iter().filter(|c| to_units(c.cost, params.scale) > cap).collect();
    let mut out = Vec::new();
    if over.is_empty() {
        return out;
    }

    let named: Vec<&str> = over.iter().take(OVER_BUDGET_LISTED).map(|c| c.id.as_str()).collect();
    let more = over.len().saturating_sub(OVER_BUDGET_LISTED);
    let mut msg = format!("{} candidate(s) cost more than the budget: {}", over.len(), named.join(", "));
    if more > 0 {
        msg.push_str(&format!(" and {more} more"));
    }
    out.push(Issue::info(codes::CANDIDATE_OVER_BUDGET, EntityRef::Root, msg));

    if over.len() == table.len() {
        out.push(Issue::warning(
            codes::BUDGET_INFEASIBLE,
            EntityRef::Param("budget"),
            format!("no candidate fits budget {}; the only allocation is the empty one", params.budget),
        ));
    }
    out
}

fn check_search_size(groups: &[Group], params: &Params) -> Vec<Issue> {
    if params.top_n == 0 || params.max_steps.is_some() {
        return Vec::new();
    }
    let leaves = estimate_search_space(groups);
    if leaves <= SEARCH_LARGE_THRESHOLD {
        return Vec::new();
    }
    vec![Issue::warning(
        codes::SEARCH_LARGE,
        EntityRef::Param("max_steps"),
        format!("top-n search space is up to {leaves} allocations; consider setting max_steps"),
    )]
}

/// Errors first, then by code, location, message.
fn sort_issues_stably(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.code.cmp(b.code))
            .then_with(|| a.where_.cmp(&b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
}

/// Errors only, for the failure message.
pub fn error_summary(report: &ValidationReport) -> String {
    report
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .map(|i| format!("{}: {}", i.code, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}
