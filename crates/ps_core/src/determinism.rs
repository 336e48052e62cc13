//! Determinism utilities: the canonical ranking order.
//!
//! One order is shared by the exact solver, the enumerator, and the report:
//!
//! 1. `delta_total` descending
//! 2. `cost_units` descending (spend more of the budget on equal improvement)
//! 3. `life_total` descending
//! 4. `member_ids` ascending, lexicographic over the sorted id list
//!
//! Levels 1–3 are the *rank key*. Level 4 only separates distinct sets whose
//! keys are identical; it turns the order into a total one.
//!
//! `Ordering::Less` means "ranks higher".

use core::cmp::Ordering;

use crate::entities::Allocation;

/// Provide a **total**, stable order for values that must sort canonically.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

/// Compare two floats descending with a total order (NaN never reaches here).
#[inline]
pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Compare the three-level rank key only.
#[inline]
pub fn cmp_rank_key(a: &Allocation, b: &Allocation) -> Ordering {
    cmp_f64_desc(a.delta_total(), b.delta_total())
        .then_with(|| b.cost_units().cmp(&a.cost_units()))
        .then_with(|| cmp_f64_desc(a.life_total(), b.life_total()))
}

impl StableOrd for Allocation {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        cmp_rank_key(self, other).then_with(|| self.member_ids().cmp(other.member_ids()))
    }
}

/// True iff `a` ranks strictly above `b`.
#[inline]
pub fn outranks(a: &Allocation, b: &Allocation) -> bool {
    a.stable_cmp(b) == Ordering::Less
}

/// Sort allocations **in place**, best first.
#[inline]
pub fn sort_ranked(xs: &mut [Allocation]) {
    xs.sort_by(|a, b| a.stable_cmp(b));
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Candidate, CandidateTable};
    use crate::ids::GroupKey;

    fn table() -> CandidateTable {
        let rows = vec![
            // id, life, cost   (baseline 70 in the tests below)
            ("a", 75.0, 100.0),
            ("b", 75.0, 200.0),
            ("c", 74.0, 50.0),
            ("d", 75.0, 200.0),
            ("e", 70.0, 10.0),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (id, life, cost))| {
            Candidate::new(id.parse().unwrap(), GroupKey::new(format!("g{i}")), life, cost).unwrap()
        })
        .collect();
        CandidateTable::new(rows, vec![]).unwrap()
    }

    fn alloc(t: &CandidateTable, rows: &[usize]) -> Allocation {
        Allocation::from_members(t, rows.to_vec(), 70.0, 1)
    }

    #[test]
    fn higher_delta_wins() {
        let t = table();
        assert!(outranks(&alloc(&t, &[0]), &alloc(&t, &[2])));
    }

    #[test]
    fn equal_delta_prefers_more_cost() {
        let t = table();
        // a (cost 100) vs b (cost 200), both delta 5
        assert!(outranks(&alloc(&t, &[1]), &alloc(&t, &[0])));
        // adding a zero-delta member spends more and therefore ranks higher
        assert!(outranks(&alloc(&t, &[0, 4]), &alloc(&t, &[0])));
    }

    #[test]
    fn identical_keys_fall_back_to_ids() {
        let t = table();
        let b = alloc(&t, &[1]);
        let d = alloc(&t, &[3]);
        assert_eq!(cmp_rank_key(&b, &d), Ordering::Equal);
        assert!(outranks(&b, &d));
        assert_eq!(b.stable_cmp(&b.clone()), Ordering::Equal);
    }

    #[test]
    fn sort_is_best_first() {
        let t = table();
        let mut v = vec![alloc(&t, &[2]), Allocation::empty(), alloc(&t, &[3]), alloc(&t, &[1])];
        sort_ranked(&mut v);
        let ids: Vec<Vec<&str>> = v
            .iter()
            .map(|a| a.member_ids().iter().map(|i| i.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["b"], vec!["d"], vec!["c"], vec![]]);
    }
}
