//! Run parameters and their domain checks.
//!
//! Every value is explicit; there are no hidden defaults. The CLI and the run
//! manifest must both provide the full set.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::scaling::to_units;

/// Upper bound on `round(budget * scale)`. The DP keeps two value layers of
/// this width plus one backpointer row per group, so this also bounds memory
/// (about 520 MB for a single group at the cap).
pub const MAX_BUDGET_UNITS: u64 = 10_000_000;

/// Upper bound on the scale factor itself.
pub const MAX_SCALE: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct Params {
    /// Reference life value; each candidate contributes `life_value - baseline_life`.
    pub baseline_life: f64,
    /// Total budget, same currency as candidate cost.
    pub budget: f64,
    /// Integer multiplier for the DP cost axis.
    pub scale: u32,
    /// Number of ranked allocations to keep.
    pub top_n: usize,
    /// Optional cap on search nodes visited by the enumerator.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub max_steps: Option<u64>,
}

impl Params {
    /// Check every parameter against its domain. Fails on the first violation.
    pub fn validate_domains(&self) -> Result<(), CoreError> {
        if !self.baseline_life.is_finite() {
            return Err(CoreError::NonFinite("baseline_life"));
        }
        if !self.budget.is_finite() {
            return Err(CoreError::NonFinite("budget"));
        }
        if self.budget < 0.0 {
            return Err(CoreError::DomainOutOfRange("budget"));
        }
        if self.scale == 0 || self.scale > MAX_SCALE {
            return Err(CoreError::DomainOutOfRange("scale"));
        }
        if self.budget_units() > MAX_BUDGET_UNITS {
            return Err(CoreError::DomainOutOfRange("budget*scale"));
        }
        Ok(())
    }

    /// `round(budget * scale)`.
    #[inline]
    pub fn budget_units(&self) -> u64 {
        to_units(self.budget, self.scale)
    }
}
