//! Optimal Selector: exact MCKP by dynamic programming.
//!
//! Contract:
//! - Maximize `delta_total` subject to `cost_units <= round(budget * scale)`,
//!   at most one candidate per group.
//! - Ties: larger `cost_units`, then larger `life_total`.
//!
//! State: one layer of `Option<Cell>` over the cost axis `0..=cap`, where
//! `layer[b]` is the best `(delta, life)` reachable at scaled cost *exactly*
//! `b` using a prefix of the groups. Each group reads only the previous
//! layer, which is what enforces "at most one per group".
//!
//! Reconstruction: a `groups × (cap + 1)` table of item slots (or `SKIP`).
//! No member lists are stored in cells.
//!
//! Memory: two layers of 24-byte cells (current and next, swapped per group)
//! plus 4 bytes per backpointer, i.e. about `48 × (cap + 1) + 4 × cells`
//! bytes. At [`MAX_DP_CELLS`] the backpointers alone take 1 GB; a single
//! group at `MAX_BUDGET_UNITS` needs about 520 MB.
//!
//! Determinism:
//! - Within a group, "skip" is considered first and items in table order;
//!   an option replaces the incumbent only if strictly better, so earlier
//!   options win exact ties.
//! - The final level is the argmax of `(delta, b, life)`.

use std::cmp::Ordering;
use std::fmt;

use ps_core::determinism::cmp_f64_desc;
use ps_core::entities::{Allocation, CandidateTable};
use ps_core::variables::Params;
use tracing::debug;

use crate::partition::Group;
use crate::prepared::prepare;

/// Upper bound on `groups × (budget_units + 1)` backpointer cells (4 bytes each).
pub const MAX_DP_CELLS: u64 = 250_000_000;

const SKIP: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// The backpointer table would exceed [`MAX_DP_CELLS`].
    TableTooLarge { groups: usize, width: u64 },
    /// A single group holds more items than a slot can address.
    GroupTooLarge { members: usize },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::TableTooLarge { groups, width } => write!(
                f,
                "dp table too large: {groups} groups x {width} budget levels exceeds {MAX_DP_CELLS} cells"
            ),
            SelectError::GroupTooLarge { members } => {
                write!(f, "group has {members} members; too many for one group")
            }
        }
    }
}

impl std::error::Error for SelectError {}

#[derive(Clone, Copy, Debug)]
struct Cell {
    delta: f64,
    life: f64,
}

impl Cell {
    /// Strictly better on `(delta, life)`.
    #[inline]
    fn beats(&self, other: &Cell) -> bool {
        cmp_f64_desc(self.delta, other.delta)
            .then_with(|| cmp_f64_desc(self.life, other.life))
            == Ordering::Less
    }
}

/// Return the single best feasible allocation.
///
/// *Notes*:
/// - `budget = 0` or nothing fits ⇒ the empty allocation.
/// - Items whose scaled cost exceeds the budget are never considered.
/// - Negative-delta items never end up selected: the same set without them
///   is reachable and strictly better on delta.
pub fn select_optimal(
    table: &CandidateTable,
    groups: &[Group],
    params: &Params,
) -> Result<Allocation, SelectError> {
    let cap = params.budget_units();
    let width = cap + 1;
    let cells = (groups.len() as u64).saturating_mul(width);
    if cells > MAX_DP_CELLS {
        return Err(SelectError::TableTooLarge { groups: groups.len(), width });
    }
    if let Some(g) = groups.iter().find(|g| g.members.len() >= SKIP as usize) {
        return Err(SelectError::GroupTooLarge { members: g.members.len() });
    }
    // Both bounds above keep these conversions lossless.
    let cap = cap as usize;
    let width = width as usize;

    let items = prepare(table, groups, params.baseline_life, params.scale);

    let mut layer: Vec<Option<Cell>> = vec![None; width];
    layer[0] = Some(Cell { delta: 0.0, life: 0.0 });
    let mut next: Vec<Option<Cell>> = vec![None; width];
    let mut choice: Vec<u32> = vec![SKIP; groups.len() * width];

    for (g, group_items) in items.iter().enumerate() {
        // "skip" is the incumbent everywhere.
        next.copy_from_slice(&layer);
        let row = &mut choice[g * width..(g + 1) * width];

        for (slot, it) in group_items.iter().enumerate() {
            if it.units > cap as u64 {
                continue;
            }
            let c = it.units as usize;
            for b in c..width {
                let Some(base) = layer[b - c] else { continue };
                let cand = Cell { delta: base.delta + it.delta, life: base.life + it.life };
                let take = match &next[b] {
                    None => true,
                    Some(cur) => cand.beats(cur),
                };
                if take {
                    next[b] = Some(cand);
                    row[b] = slot as u32;
                }
            }
        }
        std::mem::swap(&mut layer, &mut next);
    }

    // Argmax over reachable levels of (delta, b, life).
    let mut best_b = 0usize;
    let mut best = Cell { delta: 0.0, life: 0.0 };
    for (b, cell) in layer.iter().enumerate() {
        let Some(cell) = cell else { continue };
        let ord = cmp_f64_desc(cell.delta, best.delta)
            .then_with(|| b.cmp(&best_b).reverse())
            .then_with(|| cmp_f64_desc(cell.life, best.life));
        if b == 0 || ord == Ordering::Less {
            best = *cell;
            best_b = b;
        }
    }

    // Walk the backpointers from the last group to the first.
    let mut members = Vec::new();
    let mut b = best_b;
    for g in (0..items.len()).rev() {
        let slot = choice[g * width + b];
        if slot != SKIP {
            let it = &items[g][slot as usize];
            members.push(it.row);
            b -= it.units as usize;
        }
    }
    members.reverse();

    let alloc = Allocation::from_members(table, members, params.baseline_life, params.scale);
    debug!(
        groups = groups.len(),
        budget_units = cap,
        members = alloc.len(),
        delta_total = alloc.delta_total(),
        cost_units = alloc.cost_units(),
        "optimal allocation selected"
    );
    Ok(alloc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition_groups;
    use ps_core::entities::Candidate;
    use ps_core::ids::GroupKey;

    /// (id, group, life, cost)
    fn table(rows: &[(&str, &str, f64, f64)]) -> CandidateTable {
        let rows = rows
            .iter()
            .map(|&(id, g, life, cost)| {
                Candidate::new(id.parse().unwrap(), GroupKey::new(g), life, cost).unwrap()
            })
            .collect();
        CandidateTable::new(rows, vec![]).unwrap()
    }

    fn params(baseline: f64, budget: f64, scale: u32) -> Params {
        Params { baseline_life: baseline, budget, scale, top_n: 5, max_steps: None }
    }

    fn ids(a: &Allocation) -> Vec<&str> {
        a.member_ids().iter().map(|i| i.as_str()).collect()
    }

    fn solve(t: &CandidateTable, p: &Params) -> Allocation {
        select_optimal(t, &partition_groups(t), p).unwrap()
    }

    #[test]
    fn two_of_three_fit() {
        let t = table(&[
            ("p1", "g1", 75.0, 1000.0),
            ("p2", "g2", 75.0, 1000.0),
            ("p3", "g3", 75.0, 1000.0),
        ]);
        let a = solve(&t, &params(70.0, 2500.0, 1));
        assert_eq!(a.len(), 2);
        assert_eq!(a.cost_total(), 2000.0);
        assert_eq!(a.delta_total(), 10.0);
        // first two groups win the exact tie
        assert_eq!(ids(&a), vec!["p1", "p2"]);
    }

    #[test]
    fn at_most_one_per_group() {
        let t = table(&[("small", "g", 73.0, 500.0), ("large", "g", 80.0, 2000.0)]);
        let a = solve(&t, &params(70.0, 2000.0, 1));
        assert_eq!(ids(&a), vec!["large"]);
        assert_eq!(a.delta_total(), 10.0);

        // Even with room for both, only one may be taken.
        let a = solve(&t, &params(70.0, 10_000.0, 1));
        assert_eq!(ids(&a), vec!["large"]);
    }

    #[test]
    fn zero_budget_is_empty() {
        let t = table(&[("p1", "g1", 75.0, 1.0)]);
        let a = solve(&t, &params(70.0, 0.0, 20));
        assert!(a.is_empty());
        assert_eq!(a.delta_total(), 0.0);
        assert_eq!(a.cost_total(), 0.0);
    }

    #[test]
    fn zero_cost_item_fits_zero_budget() {
        let t = table(&[("free", "g1", 71.0, 0.0)]);
        let a = solve(&t, &params(70.0, 0.0, 20));
        assert_eq!(ids(&a), vec!["free"]);
    }

    #[test]
    fn negative_delta_never_selected() {
        let t = table(&[("bad", "g1", 60.0, 1.0), ("good", "g2", 71.0, 1.0)]);
        let a = solve(&t, &params(70.0, 100.0, 1));
        assert_eq!(ids(&a), vec!["good"]);
    }

    #[test]
    fn zero_delta_member_raises_spend() {
        let t = table(&[("a", "g1", 72.0, 100.0), ("flat", "g2", 70.0, 50.0)]);
        let a = solve(&t, &params(70.0, 200.0, 1));
        assert_eq!(ids(&a), vec!["a", "flat"]);
        assert_eq!(a.delta_total(), 2.0);
        assert_eq!(a.cost_units(), 150);
    }

    #[test]
    fn equal_delta_prefers_more_cost_then_life() {
        // Same delta 4.0 three ways; x+y costs more than z.
        let t = table(&[
            ("x", "g1", 72.0, 10.0),
            ("y", "g2", 72.0, 10.0),
            ("z", "g3", 74.0, 15.0),
        ]);
        let a = solve(&t, &params(70.0, 25.0, 1));
        // x+y+z = delta 8 costs 35 > 25; best is two items with delta 6 (x+z or y+z, cost 25)
        assert_eq!(a.delta_total(), 6.0);
        assert_eq!(a.cost_units(), 25);
        assert_eq!(ids(&a), vec!["x", "z"]);
    }

    #[test]
    fn fractional_costs_use_scaled_axis() {
        // 0.6 + 0.45 = 1.05 > 1.0 in units of 1/20 (12 + 9 = 21 > 20)
        let t = table(&[("a", "g1", 71.0, 0.6), ("b", "g2", 71.5, 0.45)]);
        let a = solve(&t, &params(70.0, 1.0, 20));
        assert_eq!(ids(&a), vec!["b"]);
        assert_eq!(a.cost_units(), 9);
    }

    #[test]
    fn table_guard() {
        let t = table(&[("a", "g1", 71.0, 1.0), ("b", "g2", 71.0, 1.0)]);
        let p = params(70.0, 2_000_000.0, 100);
        let err = select_optimal(&t, &partition_groups(&t), &p).unwrap_err();
        assert!(matches!(err, SelectError::TableTooLarge { groups: 2, .. }));
    }

    #[test]
    fn no_groups_is_empty() {
        let t = CandidateTable::default();
        let a = select_optimal(&t, &[], &params(70.0, 10.0, 1)).unwrap();
        assert!(a.is_empty());
    }
}
