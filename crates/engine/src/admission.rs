// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Staging-slot allocation across transfer shares.
//!
//! Recomputed from demand at the start of every pass. Within the pass the
//! engine compares each share's live occupancy against the allocation; the
//! allocation itself is never patched.

use arex_adapters::Direction;
use arex_core::Limit;
use std::collections::{BTreeMap, HashMap};

/// Per-share staging demand observed at the start of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShareDemand {
    /// Jobs currently in PREPARING.
    pub preparing: u32,
    /// Jobs currently in FINISHING.
    pub finishing: u32,
    /// ACCEPTED jobs ready to enter PREPARING.
    pub want_preparing: u32,
    /// INLRMS jobs ready to enter FINISHING.
    pub want_finishing: u32,
}

impl ShareDemand {
    pub fn total(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Download => self.preparing + self.want_preparing,
            Direction::Upload => self.finishing + self.want_finishing,
        }
    }

    fn is_empty(&self) -> bool {
        self.total(Direction::Download) == 0 && self.total(Direction::Upload) == 0
    }
}

/// Static inputs to the allocation.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy<'a> {
    /// Global cap on PREPARING + FINISHING.
    pub staging_cap: Limit,
    /// Ceiling for any single unprivileged share.
    pub per_share_max: Limit,
    /// Shares with reserved slots.
    pub privileged: &'a BTreeMap<String, u32>,
}

/// Slots each share may hold in each staging direction during one pass.
///
/// Shares without demand are absent. An absent share gets no slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    unlimited: bool,
    preparing: HashMap<String, u32>,
    finishing: HashMap<String, u32>,
}

impl Allocation {
    /// Allocation admitting every job.
    pub fn unlimited() -> Self {
        Self { unlimited: true, ..Self::default() }
    }

    /// Compute the allocation for one pass.
    ///
    /// `rotation` picks which shares get the single slots when more shares
    /// want a direction than it has slots; pass the pass counter so every
    /// share is served in turn.
    pub fn compute(
        policy: AdmissionPolicy<'_>,
        demand: &BTreeMap<String, ShareDemand>,
        rotation: u64,
    ) -> Self {
        let Some(cap) = policy.staging_cap.get() else {
            return Self::unlimited();
        };
        let mut alloc = Self::default();

        // Privileged shares take their reservations first
        let mut reserved_total = 0u32;
        for (share, d) in demand.iter().filter(|(_, d)| !d.is_empty()) {
            let Some(reserved) = policy.privileged.get(share) else { continue };
            let reserved = (*reserved).min(cap - reserved_total);
            let (prep, fin) = split_reserved(
                reserved,
                d.total(Direction::Download),
                d.total(Direction::Upload),
            );
            alloc.insert(Direction::Download, share, prep);
            alloc.insert(Direction::Upload, share, fin);
            reserved_total += prep + fin;
        }

        let unprivileged: Vec<(&String, &ShareDemand)> = demand
            .iter()
            .filter(|(share, d)| !d.is_empty() && !policy.privileged.contains_key(*share))
            .collect();
        let capacity = cap - reserved_total;
        let want = |direction| -> u32 {
            unprivileged.iter().map(|(_, d)| d.total(direction)).sum()
        };
        let (want_prep, want_fin) = (want(Direction::Download), want(Direction::Upload));
        let half = capacity / 2;
        let (prep_cap, fin_cap) = if want_prep <= half {
            (want_prep, capacity - want_prep)
        } else if want_fin <= half {
            (capacity - want_fin, want_fin)
        } else {
            // Both sides starve equally
            (half, half)
        };

        for (direction, dir_cap) in [(Direction::Download, prep_cap), (Direction::Upload, fin_cap)] {
            let shares: Vec<(&str, u32)> = unprivileged
                .iter()
                .map(|(share, d)| (share.as_str(), d.total(direction)))
                .filter(|(_, want)| *want > 0)
                .collect();
            for (share, slots) in fill(&shares, dir_cap, policy.per_share_max, rotation) {
                alloc.insert(direction, share, slots);
            }
        }
        alloc
    }

    fn insert(&mut self, direction: Direction, share: &str, slots: u32) {
        if slots > 0 {
            self.map_mut(direction).insert(share.to_string(), slots);
        }
    }

    fn map(&self, direction: Direction) -> &HashMap<String, u32> {
        match direction {
            Direction::Download => &self.preparing,
            Direction::Upload => &self.finishing,
        }
    }

    fn map_mut(&mut self, direction: Direction) -> &mut HashMap<String, u32> {
        match direction {
            Direction::Download => &mut self.preparing,
            Direction::Upload => &mut self.finishing,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    /// Slots for `share`, `None` when unlimited.
    pub fn slots(&self, direction: Direction, share: &str) -> Option<u32> {
        if self.unlimited {
            return None;
        }
        Some(self.map(direction).get(share).copied().unwrap_or(0))
    }

    /// True when a share holding `occupancy` jobs may admit one more.
    pub fn allows(&self, direction: Direction, share: &str, occupancy: u32) -> bool {
        self.slots(direction, share).map_or(true, |slots| occupancy < slots)
    }

    /// Sum of all allocated slots in both directions.
    pub fn total(&self) -> u32 {
        self.preparing.values().chain(self.finishing.values()).sum()
    }

    /// Allocated shares for one direction, sorted by name.
    pub fn shares(&self, direction: Direction) -> Vec<(String, u32)> {
        let mut shares: Vec<(String, u32)> =
            self.map(direction).iter().map(|(s, n)| (s.clone(), *n)).collect();
        shares.sort();
        shares
    }
}

/// Split a privileged reservation between the two directions.
fn split_reserved(reserved: u32, want_prep: u32, want_fin: u32) -> (u32, u32) {
    let fin = want_fin.min((reserved / 2).max(reserved - want_prep.min(reserved)));
    let prep = want_prep.min(reserved - fin);
    (prep, fin)
}

/// Distribute `capacity` slots among shares with nonzero demand.
fn fill<'a>(
    shares: &[(&'a str, u32)],
    capacity: u32,
    per_share_max: Limit,
    rotation: u64,
) -> Vec<(&'a str, u32)> {
    let ceiling = per_share_max.get().unwrap_or(u32::MAX);
    if shares.is_empty() || capacity == 0 || ceiling == 0 {
        return Vec::new();
    }
    let n = shares.len();
    if n > capacity as usize {
        // One slot each for a rotating subset
        let start = (rotation % n as u64) as usize;
        return (0..capacity as usize).map(|k| (shares[(start + k) % n].0, 1)).collect();
    }

    // Water-fill: smallest demand first, each takes at most an even share
    let mut by_demand = shares.to_vec();
    by_demand.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    let mut remaining = capacity;
    let mut out = Vec::with_capacity(n);
    for (i, (share, want)) in by_demand.into_iter().enumerate() {
        let fair = remaining / (n - i) as u32;
        let slots = want.min(fair).min(ceiling);
        remaining -= slots;
        out.push((share, slots));
    }
    out
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
