// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

fn demand(entries: &[(&str, u32, u32)]) -> BTreeMap<String, ShareDemand> {
    entries
        .iter()
        .map(|(share, prep, fin)| {
            (
                share.to_string(),
                ShareDemand { want_preparing: *prep, want_finishing: *fin, ..Default::default() },
            )
        })
        .collect()
}

fn policy(cap: Limit, privileged: &BTreeMap<String, u32>) -> AdmissionPolicy<'_> {
    AdmissionPolicy { staging_cap: cap, per_share_max: Limit::Unlimited, privileged }
}

#[test]
fn unlimited_cap_admits_everything() {
    let none = BTreeMap::new();
    let alloc = Allocation::compute(policy(Limit::Unlimited, &none), &demand(&[("a", 50, 0)]), 0);
    assert!(alloc.is_unlimited());
    assert!(alloc.allows(Direction::Download, "a", 1_000));
    assert!(alloc.allows(Direction::Upload, "never-seen", 1_000));
    assert_eq!(alloc.slots(Direction::Download, "a"), None);
}

#[test]
fn share_without_demand_is_absent() {
    let none = BTreeMap::new();
    let alloc =
        Allocation::compute(policy(Limit::Max(10), &none), &demand(&[("a", 3, 0), ("idle", 0, 0)]), 0);
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(3));
    assert_eq!(alloc.slots(Direction::Download, "idle"), Some(0));
    assert!(alloc.shares(Direction::Download).iter().all(|(s, _)| s != "idle"));
    assert!(alloc.shares(Direction::Upload).is_empty());
}

#[test]
fn low_demand_share_keeps_what_it_asks_for() {
    let none = BTreeMap::new();
    let alloc =
        Allocation::compute(policy(Limit::Max(10), &none), &demand(&[("small", 2, 0), ("big", 20, 0)]), 0);
    assert_eq!(alloc.slots(Direction::Download, "small"), Some(2));
    assert_eq!(alloc.slots(Direction::Download, "big"), Some(8));
}

#[test]
fn busy_shares_split_evenly() {
    let none = BTreeMap::new();
    let alloc = Allocation::compute(
        policy(Limit::Max(9), &none),
        &demand(&[("a", 20, 0), ("b", 20, 0), ("c", 20, 0)]),
        0,
    );
    for share in ["a", "b", "c"] {
        assert_eq!(alloc.slots(Direction::Download, share), Some(3), "{share}");
    }
}

#[test]
fn more_shares_than_slots_rotate_single_slots() {
    let none = BTreeMap::new();
    let d = demand(&[("a", 5, 0), ("b", 5, 0), ("c", 5, 0)]);
    let first = Allocation::compute(policy(Limit::Max(2), &none), &d, 0);
    let second = Allocation::compute(policy(Limit::Max(2), &none), &d, 1);
    assert_eq!(first.shares(Direction::Download), vec![("a".into(), 1), ("b".into(), 1)]);
    assert_eq!(second.shares(Direction::Download), vec![("b".into(), 1), ("c".into(), 1)]);
}

#[test]
fn per_share_ceiling_caps_a_lone_share() {
    let none = BTreeMap::new();
    let p = AdmissionPolicy {
        staging_cap: Limit::Max(10),
        per_share_max: Limit::Max(4),
        privileged: &none,
    };
    let alloc = Allocation::compute(p, &demand(&[("a", 20, 0)]), 0);
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(4));
}

#[test]
fn both_directions_starved_get_half_each() {
    let none = BTreeMap::new();
    let alloc = Allocation::compute(policy(Limit::Max(10), &none), &demand(&[("a", 30, 30)]), 0);
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(5));
    assert_eq!(alloc.slots(Direction::Upload, "a"), Some(5));
}

#[test]
fn quiet_direction_leaves_the_rest_to_the_other() {
    let none = BTreeMap::new();
    let alloc = Allocation::compute(policy(Limit::Max(10), &none), &demand(&[("a", 30, 2)]), 0);
    assert_eq!(alloc.slots(Direction::Upload, "a"), Some(2));
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(8));
}

#[test]
fn privileged_share_takes_reserved_slots_off_the_pool() {
    let privileged: BTreeMap<String, u32> = [("vip".to_string(), 4)].into();
    let alloc = Allocation::compute(
        policy(Limit::Max(10), &privileged),
        &demand(&[("vip", 10, 0), ("a", 20, 0)]),
        0,
    );
    assert_eq!(alloc.slots(Direction::Download, "vip"), Some(4));
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(6));
}

#[test]
fn idle_privileged_share_reserves_nothing() {
    let privileged: BTreeMap<String, u32> = [("vip".to_string(), 4)].into();
    let alloc =
        Allocation::compute(policy(Limit::Max(10), &privileged), &demand(&[("a", 20, 0)]), 0);
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(10));
    assert_eq!(alloc.slots(Direction::Download, "vip"), Some(0));
}

#[test]
fn occupancy_counts_against_the_allocation() {
    let none = BTreeMap::new();
    let mut d = demand(&[("a", 1, 0)]);
    if let Some(share) = d.get_mut("a") {
        share.preparing = 2;
    }
    let alloc = Allocation::compute(policy(Limit::Max(10), &none), &d, 0);
    assert_eq!(alloc.slots(Direction::Download, "a"), Some(3));
    assert!(alloc.allows(Direction::Download, "a", 2));
    assert!(!alloc.allows(Direction::Download, "a", 3));
}

#[yare::parameterized(
    both_want_plenty = { 4, 10, 10, 2, 2 },
    prep_only = { 4, 10, 0, 4, 0 },
    fin_small = { 4, 10, 1, 3, 1 },
    prep_small = { 4, 1, 10, 1, 3 },
    single_slot = { 1, 5, 5, 1, 0 },
)]
fn reserved_split(reserved: u32, prep: u32, fin: u32, want_prep: u32, want_fin: u32) {
    assert_eq!(split_reserved(reserved, prep, fin), (want_prep, want_fin));
}

fn arb_demand() -> impl Strategy<Value = BTreeMap<String, ShareDemand>> {
    proptest::collection::btree_map(
        "[a-f]",
        (0u32..6, 0u32..6, 0u32..20, 0u32..20).prop_map(|(p, f, wp, wf)| ShareDemand {
            preparing: p,
            finishing: f,
            want_preparing: wp,
            want_finishing: wf,
        }),
        0..6,
    )
}

proptest! {
    #[test]
    fn allocations_never_exceed_the_cap(
        cap in 0u32..40,
        per_share in prop_oneof![Just(Limit::Unlimited), (0u32..8).prop_map(Limit::Max)],
        reserved in proptest::collection::btree_map("[a-c]", 0u32..10, 0..3),
        demand in arb_demand(),
        rotation: u64,
    ) {
        let p = AdmissionPolicy {
            staging_cap: Limit::Max(cap),
            per_share_max: per_share,
            privileged: &reserved,
        };
        let alloc = Allocation::compute(p, &demand, rotation);
        prop_assert!(alloc.total() <= cap, "total {} > cap {}", alloc.total(), cap);
    }

    #[test]
    fn no_share_is_given_more_than_it_wants(demand in arb_demand(), cap in 0u32..40, rotation: u64) {
        let none = BTreeMap::new();
        let alloc = Allocation::compute(policy(Limit::Max(cap), &none), &demand, rotation);
        for direction in [Direction::Download, Direction::Upload] {
            for (share, slots) in alloc.shares(direction) {
                let want = demand.get(&share).map(|d| d.total(direction)).unwrap_or(0);
                prop_assert!(slots >= 1 && slots <= want);
            }
        }
    }
}
