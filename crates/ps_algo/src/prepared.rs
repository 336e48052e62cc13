//! Per-group item lists with the scaled cost and delta precomputed, shared by
//! both solvers so they read identical numbers.

use ps_core::entities::CandidateTable;
use ps_core::scaling::to_units;

use crate::partition::Group;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Item {
    pub row: usize,
    pub units: u64,
    pub delta: f64,
    pub life: f64,
}

pub(crate) fn prepare(
    table: &CandidateTable,
    groups: &[Group],
    baseline_life: f64,
    scale: u32,
) -> Vec<Vec<Item>> {
    groups
        .iter()
        .map(|g| {
            g.members
                .iter()
                .filter_map(|&row| {
                    table.get(row).map(|c| Item {
                        row,
                        units: to_units(c.cost, scale),
                        delta: c.delta(baseline_life),
                        life: c.life_value,
                    })
                })
                .collect()
        })
        .collect()
}
