//! Top-N Enumerator: the N best distinct feasible allocations.
//!
//! Backtracking over the group sequence. At each group the search first
//! skips the group, then tries each member in table order; a branch is
//! pruned as soon as its running scaled cost exceeds the budget. Every leaf
//! is a feasible allocation (including the empty one) and is offered to a
//! bounded accumulator that keeps the N best under the canonical order.
//!
//! The search is exponential in the number of groups. It is meant for tens
//! of groups with a handful of variants each; `max_steps` bounds the work
//! and flags the result as truncated when hit.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use std::ops::ControlFlow;

use ps_core::determinism::{outranks, StableOrd};
use ps_core::entities::{Allocation, CandidateTable, RankedResult};
use ps_core::ids::CandidateId;
use ps_core::variables::Params;
use tracing::{debug, warn};

use crate::partition::Group;
use crate::prepared::{prepare, Item};

/* ------------------------------ Accumulator ------------------------------ */

/// Heap entry ordered so that the *worst* allocation sits on top.
struct Ranked(Allocation);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Ranked {}
impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Ranked {
    // `Less` = better, so the max-heap's top is the worst entry.
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.stable_cmp(&other.0)
    }
}

/// Bounded worst-first retention of the best `cap` distinct allocations.
struct TopN {
    cap: usize,
    heap: BinaryHeap<Ranked>,
    held: BTreeSet<Vec<CandidateId>>,
}

impl TopN {
    fn new(cap: usize) -> Self {
        Self { cap, heap: BinaryHeap::with_capacity(cap + 1), held: BTreeSet::new() }
    }

    /// Insert when there is room, or when `a` strictly outranks the current worst.
    fn offer(&mut self, a: Allocation) {
        if self.cap == 0 || self.held.contains(a.member_ids()) {
            return;
        }
        if self.heap.len() < self.cap {
            self.held.insert(a.member_ids().to_vec());
            self.heap.push(Ranked(a));
            return;
        }
        let replace = match self.heap.peek() {
            Some(worst) => outranks(&a, &worst.0),
            None => false,
        };
        if replace {
            if let Some(Ranked(evicted)) = self.heap.pop() {
                self.held.remove(evicted.member_ids());
            }
            self.held.insert(a.member_ids().to_vec());
            self.heap.push(Ranked(a));
        }
    }

    /// Best first.
    fn into_sorted(self) -> Vec<Allocation> {
        self.heap.into_sorted_vec().into_iter().map(|Ranked(a)| a).collect()
    }
}

/* -------------------------------- Search --------------------------------- */

struct Search<'a> {
    table: &'a CandidateTable,
    items: &'a [Vec<Item>],
    params: &'a Params,
    cap_units: u64,
    max_steps: Option<u64>,
    steps: u64,
}

impl Search<'_> {
    fn descend(
        &mut self,
        g: usize,
        units: u64,
        path: &mut Vec<usize>,
        acc: &mut TopN,
    ) -> ControlFlow<()> {
        if let Some(max) = self.max_steps {
            if self.steps >= max {
                return ControlFlow::Break(());
            }
        }
        self.steps += 1;

        if g == self.items.len() {
            acc.offer(Allocation::from_members(
                self.table,
                path.clone(),
                self.params.baseline_life,
                self.params.scale,
            ));
            return ControlFlow::Continue(());
        }

        // Skip this group.
        if self.descend(g + 1, units, path, acc).is_break() {
            return ControlFlow::Break(());
        }

        let items = self.items;
        for it in &items[g] {
            let next = units.saturating_add(it.units);
            if next > self.cap_units {
                continue;
            }
            path.push(it.row);
            let flow = self.descend(g + 1, next, path, acc);
            path.pop();
            if flow.is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Return up to `params.top_n` distinct feasible allocations, best first.
///
/// *Notes*:
/// - `top_n = 0` returns an empty result without searching.
/// - The empty allocation is a valid entry.
/// - With `max_steps` set, the best allocations found before the cutoff are
///   returned and `truncated` is set.
pub fn enumerate_top_n(table: &CandidateTable, groups: &[Group], params: &Params) -> RankedResult {
    if params.top_n == 0 {
        return RankedResult::default();
    }

    let items = prepare(table, groups, params.baseline_life, params.scale);
    let mut search = Search {
        table,
        items: &items,
        params,
        cap_units: params.budget_units(),
        max_steps: params.max_steps,
        steps: 0,
    };
    let mut acc = TopN::new(params.top_n);
    let mut path = Vec::with_capacity(groups.len());
    // Only the step budget breaks out of the search.
    let truncated = search.descend(0, 0, &mut path, &mut acc).is_break();

    let entries = acc.into_sorted();
    if truncated {
        warn!(steps = search.steps, kept = entries.len(), "top-n search truncated by step budget");
    }
    debug!(
        groups = groups.len(),
        steps = search.steps,
        kept = entries.len(),
        truncated,
        "top-n enumeration finished"
    );
    RankedResult { entries, truncated, steps: search.steps }
}

/// Upper bound on leaves the search may visit: `Π (members + 1)`, saturating.
pub fn estimate_search_space(groups: &[Group]) -> u64 {
    groups
        .iter()
        .fold(1u64, |acc, g| acc.saturating_mul(g.members.len() as u64 + 1))
}
