//! Group Partitioner.
//!
//! Splits the candidate table into mutually exclusive groups by `group_key`.
//! Groups come out in first-seen order of their key and members keep table
//! order, so downstream iteration is reproducible without any sorting.

use std::collections::BTreeMap;

use ps_core::entities::CandidateTable;
use ps_core::ids::GroupKey;

/// Candidates sharing one `group_key`; at most one may be funded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    /// Table rows, in table order.
    pub members: Vec<usize>,
}

/// Single pass over the table. Empty input yields no groups.
pub fn partition_groups(table: &CandidateTable) -> Vec<Group> {
    let mut slot_of: BTreeMap<&GroupKey, usize> = BTreeMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for (row, c) in table.iter().enumerate() {
        match slot_of.get(&c.group_key) {
            Some(&g) => groups[g].members.push(row),
            None => {
                slot_of.insert(&c.group_key, groups.len());
                groups.push(Group { key: c.group_key.clone(), members: vec![row] });
            }
        }
    }
    groups
}
