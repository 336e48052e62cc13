//! Structured, non-fatal findings. Returned as data alongside results so
//! callers never have to scrape logs.

use core::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::ids::{CandidateId, GroupKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "ref", rename_all = "snake_case"))]
pub enum EntityRef {
    Root,
    /// 1-based data row (header excluded).
    Row(usize),
    Column(String),
    Candidate(CandidateId),
    Group(GroupKey),
    Param(&'static str),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Root => f.write_str("root"),
            EntityRef::Row(n) => write!(f, "row {n}"),
            EntityRef::Column(c) => write!(f, "column {c}"),
            EntityRef::Candidate(id) => write!(f, "candidate {id}"),
            EntityRef::Group(g) => write!(f, "group {g}"),
            EntityRef::Param(p) => write!(f, "param {p}"),
        }
    }
}

/// One finding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Issue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[cfg_attr(feature = "serde", serde(rename = "where"))]
    pub where_: EntityRef,
}

impl Issue {
    pub fn error(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), where_ }
    }

    pub fn warning(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, code, message: message.into(), where_ }
    }

    pub fn info(code: &'static str, where_: EntityRef, message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, code, message: message.into(), where_ }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}: {}", self.severity.as_str(), self.code, self.where_, self.message)
    }
}

/// True when no issue is an error.
pub fn passes(issues: &[Issue]) -> bool {
    !issues.iter().any(|i| i.severity == Severity::Error)
}

/// Issue codes emitted across the workspace.
pub mod codes {
    pub const ROW_VALUE_COERCED: &str = "Row.ValueCoerced";
    pub const ROW_NEGATIVE_COST: &str = "Row.NegativeCost";
    pub const ROW_MISSING_ID: &str = "Row.MissingId";
    pub const ROW_INVALID_ID: &str = "Row.InvalidId";
    pub const ROW_DUPLICATE_ID: &str = "Row.DuplicateId";
    pub const INPUT_LATIN1_FALLBACK: &str = "Input.Latin1Fallback";
    pub const INPUT_EMPTY: &str = "Input.Empty";
    pub const PARAM_DOMAIN: &str = "Param.Domain";
    pub const CANDIDATE_OVER_BUDGET: &str = "Candidate.OverBudget";
    pub const BUDGET_INFEASIBLE: &str = "Budget.Infeasible";
    pub const SEARCH_LARGE: &str = "Search.Large";
    pub const SEARCH_TRUNCATED: &str = "Search.Truncated";
    pub const DETAIL_UNRESOLVED_MEMBER: &str = "Detail.UnresolvedMember";
    pub const DETAIL_NO_MEMBERS_RESOLVED: &str = "Detail.NoMembersResolved";
}
