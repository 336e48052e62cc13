//! Property tests for the MCKP solvers.
//!
//! Lives are integer-valued so every delta sum is exact in f64 and the
//! solvers' keys can be compared for equality. Costs are integers at
//! `scale = 1`, or cents at `scale` 10, 20 or 100 so the rounding onto the
//! unit axis is exercised too.

use std::collections::BTreeSet;

use proptest::prelude::*;
use ps_algo::{enumerate_top_n, partition_groups, select_optimal, Group};
use ps_core::determinism::{cmp_rank_key, sort_ranked, StableOrd};
use ps_core::entities::{Allocation, Candidate, CandidateTable};
use ps_core::ids::GroupKey;
use ps_core::variables::Params;

/// (group index, life, cost) per row.
fn rows_strategy() -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
    prop::collection::vec((0u8..5, 60u8..90, 0u8..40), 0..10)
}

/// (group index, life, cost in cents) per row.
fn cent_rows_strategy() -> impl Strategy<Value = Vec<(u8, u8, u16)>> {
    prop::collection::vec((0u8..5, 60u8..90, 0u16..4000), 0..10)
}

fn scale_strategy() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![10u32, 20, 100])
}

fn build_table(rows: &[(u8, u8, u8)]) -> CandidateTable {
    let costs: Vec<(u8, u8, f64)> = rows.iter().map(|&(g, l, c)| (g, l, f64::from(c))).collect();
    table_of(&costs)
}

fn build_cent_table(rows: &[(u8, u8, u16)]) -> CandidateTable {
    let costs: Vec<(u8, u8, f64)> = rows.iter().map(|&(g, l, c)| (g, l, f64::from(c) / 100.0)).collect();
    table_of(&costs)
}

fn table_of(rows: &[(u8, u8, f64)]) -> CandidateTable {
    let cands = rows
        .iter()
        .enumerate()
        .map(|(i, &(g, life, cost))| {
            Candidate::new(format!("c{i:02}").parse().unwrap(), GroupKey::new(format!("g{g}")), f64::from(life), cost)
                .unwrap()
        })
        .collect();
    CandidateTable::new(cands, vec![]).unwrap()
}

fn params(budget: u16, top_n: usize) -> Params {
    Params { baseline_life: 72.0, budget: f64::from(budget), scale: 1, top_n, max_steps: None }
}

fn scaled_params(budget_cents: u16, scale: u32, top_n: usize) -> Params {
    Params { baseline_life: 72.0, budget: f64::from(budget_cents) / 100.0, scale, top_n, max_steps: None }
}

fn group_of(t: &CandidateTable, row: usize) -> &str {
    t.get(row).unwrap().group_key.as_str()
}

fn one_per_group(t: &CandidateTable, a: &Allocation) -> bool {
    let keys: BTreeSet<&str> = a.members().iter().map(|&r| group_of(t, r)).collect();
    keys.len() == a.len()
}

/// Every feasible allocation, by brute force over the group product.
fn brute_force(t: &CandidateTable, groups: &[Group], p: &Params) -> Vec<Allocation> {
    let mut out = vec![Vec::<usize>::new()];
    for g in groups {
        let mut next = Vec::new();
        for base in &out {
            next.push(base.clone());
            for &m in &g.members {
                let mut v = base.clone();
                v.push(m);
                next.push(v);
            }
        }
        out = next;
    }
    let mut all: Vec<Allocation> = out
        .into_iter()
        .map(|m| Allocation::from_members(t, m, p.baseline_life, p.scale))
        .filter(|a| a.cost_units() <= p.budget_units())
        .collect();
    sort_ranked(&mut all);
    all
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn optimal_respects_budget_and_groups(rows in rows_strategy(), budget in 0u16..150) {
        let t = build_table(&rows);
        let groups = partition_groups(&t);
        let p = params(budget, 1);
        let a = select_optimal(&t, &groups, &p).unwrap();
        prop_assert!(a.cost_units() <= p.budget_units());
        prop_assert!(one_per_group(&t, &a));
    }

    #[test]
    fn optimal_delta_monotone_in_budget(rows in rows_strategy(), budget in 0u16..120, extra in 0u16..60) {
        let t = build_table(&rows);
        let groups = partition_groups(&t);
        let lo = select_optimal(&t, &groups, &params(budget, 1)).unwrap();
        let hi = select_optimal(&t, &groups, &params(budget + extra, 1)).unwrap();
        prop_assert!(hi.delta_total() >= lo.delta_total());
    }

    #[test]
    fn top_n_entries_valid_distinct_sorted(rows in rows_strategy(), budget in 0u16..150, n in 1usize..8) {
        let t = build_table(&rows);
        let r = enumerate_top_n(&t, &partition_groups(&t), &params(budget, n));
        prop_assert!(r.len() <= n);
        let mut seen = BTreeSet::new();
        for a in &r.entries {
            prop_assert!(a.cost_units() <= u64::from(budget));
            prop_assert!(one_per_group(&t, a));
            prop_assert!(seen.insert(a.member_ids().to_vec()));
        }
        for w in r.entries.windows(2) {
            prop_assert_eq!(w[0].stable_cmp(&w[1]), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn top_n_is_deterministic(rows in rows_strategy(), budget in 0u16..150) {
        let t = build_table(&rows);
        let groups = partition_groups(&t);
        let p = params(budget, 6);
        prop_assert_eq!(enumerate_top_n(&t, &groups, &p), enumerate_top_n(&t, &groups, &p));
    }

    #[test]
    fn top_n_matches_brute_force(rows in rows_strategy(), budget in 0u16..150, n in 1usize..10) {
        let t = build_table(&rows);
        let groups = partition_groups(&t);
        let p = params(budget, n);
        let mut expected = brute_force(&t, &groups, &p);
        expected.truncate(n);
        let got = enumerate_top_n(&t, &groups, &p);
        let got_ids: Vec<_> = got.entries.iter().map(|a| a.member_ids().to_vec()).collect();
        let exp_ids: Vec<_> = expected.iter().map(|a| a.member_ids().to_vec()).collect();
        prop_assert_eq!(got_ids, exp_ids);
    }

    #[test]
    fn fractional_costs_match_brute_force(
        rows in cent_rows_strategy(),
        budget in 0u16..15000,
        scale in scale_strategy(),
        n in 1usize..8,
    ) {
        let t = build_cent_table(&rows);
        let groups = partition_groups(&t);
        let p = scaled_params(budget, scale, n);
        let mut expected = brute_force(&t, &groups, &p);
        expected.truncate(n);

        let best = select_optimal(&t, &groups, &p).unwrap();
        prop_assert!(best.cost_units() <= p.budget_units());
        prop_assert_eq!(cmp_rank_key(&best, &expected[0]), std::cmp::Ordering::Equal);

        let got = enumerate_top_n(&t, &groups, &p);
        let got_ids: Vec<_> = got.entries.iter().map(|a| a.member_ids().to_vec()).collect();
        let exp_ids: Vec<_> = expected.iter().map(|a| a.member_ids().to_vec()).collect();
        prop_assert_eq!(got_ids, exp_ids);
    }

    #[test]
    fn optimal_key_equals_first_ranked_key(rows in rows_strategy(), budget in 0u16..150) {
        let t = build_table(&rows);
        let groups = partition_groups(&t);
        let p = params(budget, 3);
        let best = select_optimal(&t, &groups, &p).unwrap();
        let ranked = enumerate_top_n(&t, &groups, &p);
        let first = ranked.first().unwrap();
        prop_assert_eq!(cmp_rank_key(&best, first), std::cmp::Ordering::Equal);
    }
}

/* ------------------------- fixed scenarios ------------------------- */

fn fixed(rows: &[(&str, &str, f64, f64)]) -> CandidateTable {
    let cands = rows
        .iter()
        .map(|&(id, g, life, cost)| {
            Candidate::new(id.parse().unwrap(), GroupKey::new(g), life, cost).unwrap()
        })
        .collect();
    CandidateTable::new(cands, vec![]).unwrap()
}

fn ids(a: &Allocation) -> Vec<&str> {
    a.member_ids().iter().map(|i| i.as_str()).collect()
}

#[test]
fn three_singletons_budget_fits_two() {
    let t = fixed(&[("p1", "g1", 75.0, 1000.0), ("p2", "g2", 75.0, 1000.0), ("p3", "g3", 75.0, 1000.0)]);
    let p = Params { baseline_life: 70.0, budget: 2500.0, scale: 20, top_n: 3, max_steps: None };
    let a = select_optimal(&t, &partition_groups(&t), &p).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a.cost_total(), 2000.0);
    assert_eq!(a.delta_total(), 10.0);
}

#[test]
fn one_group_never_both_variants() {
    let t = fixed(&[("cheap", "same", 73.0, 500.0), ("dear", "same", 80.0, 2000.0)]);
    let p = Params { baseline_life: 70.0, budget: 2000.0, scale: 20, top_n: 10, max_steps: None };
    let groups = partition_groups(&t);
    assert_eq!(ids(&select_optimal(&t, &groups, &p).unwrap()), vec!["dear"]);
    let r = enumerate_top_n(&t, &groups, &p);
    assert!(r.entries.iter().all(|a| a.len() <= 1));
}

#[test]
fn zero_budget_optimal_and_ranked() {
    let t = fixed(&[("p1", "g1", 75.0, 10.0)]);
    let p = Params { baseline_life: 70.0, budget: 0.0, scale: 20, top_n: 5, max_steps: None };
    let groups = partition_groups(&t);
    let a = select_optimal(&t, &groups, &p).unwrap();
    assert!(a.is_empty());
    let r = enumerate_top_n(&t, &groups, &p);
    assert_eq!(r.len(), 1);
    assert!(r.entries[0].is_empty());
}

#[test]
fn costs_round_half_away_from_zero_onto_units() {
    // At scale 20, 0.025 is half a unit and rounds up; 0.024 rounds down to free.
    let t = fixed(&[("half", "g1", 80.0, 0.025), ("under", "g2", 75.0, 0.024)]);
    let p = Params { baseline_life: 70.0, budget: 0.0, scale: 20, top_n: 5, max_steps: None };
    let groups = partition_groups(&t);
    assert_eq!(ids(&select_optimal(&t, &groups, &p).unwrap()), vec!["under"]);

    let p = Params { budget: 0.05, ..p };
    assert_eq!(ids(&select_optimal(&t, &groups, &p).unwrap()), vec!["half", "under"]);
}

#[test]
fn baseline_equal_life_spends_more() {
    let t = fixed(&[("gain", "g1", 74.0, 100.0), ("neutral", "g2", 70.0, 40.0)]);
    let p = Params { baseline_life: 70.0, budget: 500.0, scale: 20, top_n: 5, max_steps: None };
    let groups = partition_groups(&t);
    let best = select_optimal(&t, &groups, &p).unwrap();
    assert_eq!(ids(&best), vec!["gain", "neutral"]);
    let r = enumerate_top_n(&t, &groups, &p);
    assert_eq!(ids(&r.entries[0]), vec!["gain", "neutral"]);
    assert_eq!(ids(&r.entries[1]), vec!["gain"]);
    assert_eq!(r.entries[0].delta_total(), r.entries[1].delta_total());
}
