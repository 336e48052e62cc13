//! ps_core: Core types, parameter domains, cost scaling, and ranking order.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`ps_io`, `ps_algo`, `ps_pipeline`, `ps_report`, `ps_cli`).
//!
//! - Identifiers: `CandidateId`, `GroupKey`, and the output ids `RES:` / `RUN:`
//! - Entities: `Candidate`, `CandidateTable`, `Allocation`, `RankedResult`
//! - Run parameters (`Params`) and their domain checks
//! - Integer cost axis helpers (`scaling`)
//! - The canonical ranking order shared by every solver (`determinism`)
//! - Structured diagnostics (`diagnostics`)
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Error set for core-domain validation & parsing.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum CoreError {
        InvalidId,
        InvalidHex,
        InvalidTimestamp,
        DuplicateId(String),
        NonFinite(&'static str),
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidId => write!(f, "invalid id"),
                CoreError::InvalidHex => write!(f, "invalid hex"),
                CoreError::InvalidTimestamp => write!(f, "invalid timestamp"),
                CoreError::DuplicateId(id) => write!(f, "duplicate candidate id: {id}"),
                CoreError::NonFinite(k) => write!(f, "value must be finite: {k}"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod ids;
pub mod entities;
pub mod variables;
pub mod scaling;
pub mod determinism;
pub mod diagnostics;

pub use entities::{Allocation, Attribute, Candidate, CandidateTable, RankedResult};
pub use errors::CoreError;
pub use ids::{CandidateId, GroupKey, ResultId, RunId};
pub use variables::Params;
