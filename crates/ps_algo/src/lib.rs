// crates/ps_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Grouped (multiple-choice) knapsack over a candidate table.
//!
//! Pipeline order: [`partition_groups`] → [`select_optimal`] and
//! [`enumerate_top_n`] (independent of each other) → [`expand_allocation`].
//! All entry points are pure and deterministic.

pub use ps_core::{
    entities::{Allocation, CandidateTable, RankedResult},
    ids::{CandidateId, GroupKey},
    variables::Params,
};

// ----------------------------- File modules -----------------------------------------

pub mod partition;
mod prepared;
pub mod optimal;
pub mod top_n;
pub mod detail;

// ----------------------------- Public surface ---------------------------------------

pub use detail::{expand_allocation, DetailReport, DetailRow};
pub use optimal::{select_optimal, SelectError, MAX_DP_CELLS};
pub use partition::{partition_groups, Group};
pub use top_n::{enumerate_top_n, estimate_search_space};
