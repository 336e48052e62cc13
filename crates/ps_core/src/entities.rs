//! Core entities: candidates, the candidate table, allocations, ranked results.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::{CandidateId, GroupKey};
use crate::scaling::to_units;

/* -------------------------------------------------------------------------- */
/*                                  Candidate                                 */
/* -------------------------------------------------------------------------- */

/// Pass-through descriptive column carried unchanged from input to output.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// One fundable project variant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candidate {
    pub id: CandidateId,
    pub group_key: GroupKey,
    pub life_value: f64,
    pub cost: f64,
    /// In input column order.
    pub attributes: Vec<Attribute>,
}

impl Candidate {
    /// Build a candidate. `life_value` must be finite; `cost` finite and `>= 0`.
    pub fn new(
        id: CandidateId,
        group_key: GroupKey,
        life_value: f64,
        cost: f64,
    ) -> Result<Self, CoreError> {
        if !life_value.is_finite() {
            return Err(CoreError::NonFinite("life_value"));
        }
        if !cost.is_finite() {
            return Err(CoreError::NonFinite("cost"));
        }
        if cost < 0.0 {
            return Err(CoreError::DomainOutOfRange("cost"));
        }
        Ok(Self { id, group_key, life_value, cost, attributes: Vec::new() })
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute { name: name.into(), value: value.into() });
        self
    }

    /// Contribution of this candidate to `delta_total`.
    #[inline]
    pub fn delta(&self, baseline_life: f64) -> f64 {
        self.life_value - baseline_life
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }
}

/* -------------------------------------------------------------------------- */
/*                               Candidate table                              */
/* -------------------------------------------------------------------------- */

/// Ordered, read-only candidate collection with an id index.
#[derive(Clone, Debug, Default)]
pub struct CandidateTable {
    rows: Vec<Candidate>,
    attribute_columns: Vec<String>,
    index: BTreeMap<CandidateId, usize>,
}

impl CandidateTable {
    /// Build the table; ids must be unique.
    pub fn new(rows: Vec<Candidate>, attribute_columns: Vec<String>) -> Result<Self, CoreError> {
        let mut index = BTreeMap::new();
        for (i, c) in rows.iter().enumerate() {
            if index.insert(c.id.clone(), i).is_some() {
                return Err(CoreError::DuplicateId(c.id.to_string()));
            }
        }
        Ok(Self { rows, attribute_columns, index })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Candidate> {
        self.rows.get(row)
    }

    pub fn index_of(&self, id: &CandidateId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn by_id(&self, id: &CandidateId) -> Option<&Candidate> {
        self.index_of(id).and_then(|i| self.rows.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[Candidate] {
        &self.rows
    }

    /// Names of the pass-through columns, in input order.
    pub fn attribute_columns(&self) -> &[String] {
        &self.attribute_columns
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Allocation                                 */
/* -------------------------------------------------------------------------- */

/// A feasible selection, at most one candidate per group.
///
/// Totals are summed in the order `members` is given. Both solvers hand over
/// members in group order, so the same set yields bit-identical totals
/// whichever solver produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    members: Vec<usize>,
    member_ids: Vec<CandidateId>,
    delta_total: f64,
    cost_total: f64,
    life_total: f64,
    cost_units: u64,
}

impl Allocation {
    /// The "invest nothing" allocation.
    pub fn empty() -> Self {
        Self {
            members: Vec::new(),
            member_ids: Vec::new(),
            delta_total: 0.0,
            cost_total: 0.0,
            life_total: 0.0,
            cost_units: 0,
        }
    }

    /// Build from table rows. Rows not present in `table` are ignored.
    pub fn from_members(
        table: &CandidateTable,
        members: Vec<usize>,
        baseline_life: f64,
        scale: u32,
    ) -> Self {
        let mut out = Self::empty();
        for row in members {
            let Some(c) = table.get(row) else { continue };
            out.delta_total += c.delta(baseline_life);
            out.cost_total += c.cost;
            out.life_total += c.life_value;
            out.cost_units += to_units(c.cost, scale);
            out.member_ids.push(c.id.clone());
            out.members.push(row);
        }
        out.member_ids.sort();
        out
    }

    /// Table rows, in group order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Member ids, ascending. This is the allocation's identity.
    pub fn member_ids(&self) -> &[CandidateId] {
        &self.member_ids
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn delta_total(&self) -> f64 {
        self.delta_total
    }

    /// Real-valued cost sum (unscaled).
    pub fn cost_total(&self) -> f64 {
        self.cost_total
    }

    pub fn life_total(&self) -> f64 {
        self.life_total
    }

    /// Sum of per-member `round(cost * scale)`.
    pub fn cost_units(&self) -> u64 {
        self.cost_units
    }

    /// `delta_total / cost_total`, or `0.0` when nothing is spent.
    pub fn ratio(&self) -> f64 {
        if self.cost_total == 0.0 {
            0.0
        } else {
            self.delta_total / self.cost_total
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                Ranked result                               */
/* -------------------------------------------------------------------------- */

/// Ordered, deduplicated top-N allocations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedResult {
    /// Best first.
    pub entries: Vec<Allocation>,
    /// True when the step budget cut the search short.
    pub truncated: bool,
    /// Search nodes visited.
    pub steps: u64,
}

impl RankedResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&Allocation> {
        self.entries.first()
    }
}
