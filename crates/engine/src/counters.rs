// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live job counters used for admission checks.
//!
//! Rebuilt from the job list at the start of every pass and kept current
//! within the pass by diffing a job's [`Slot`] before and after it is handled.

use arex_adapters::Direction;
use arex_core::{GmJob, JobState};
use std::collections::BTreeMap;

/// The parts of a job the counters care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub state: JobState,
    pub pending: bool,
    pub subject: String,
    pub share: String,
}

impl Slot {
    pub fn of(job: &GmJob) -> Self {
        Self {
            state: job.state,
            pending: job.pending,
            subject: job.subject().to_string(),
            share: job.transfer_share.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCounters {
    /// Jobs per state, not pending.
    by_state: [u32; JobState::ALL.len()],
    /// Pending jobs per state.
    pending: [u32; JobState::ALL.len()],
    /// Jobs between PREPARING and FINISHING per owning identity.
    per_dn: BTreeMap<String, u32>,
    preparing: BTreeMap<String, u32>,
    finishing: BTreeMap<String, u32>,
}

impl JobCounters {
    pub fn recount<'a>(jobs: impl IntoIterator<Item = &'a GmJob>) -> Self {
        let mut counters = Self::default();
        for job in jobs {
            counters.add(&Slot::of(job));
        }
        counters
    }

    pub fn add(&mut self, slot: &Slot) {
        let i = slot.state.index();
        if slot.pending {
            self.pending[i] += 1;
        } else {
            self.by_state[i] += 1;
        }
        if slot.state.is_active() {
            *self.per_dn.entry(slot.subject.clone()).or_default() += 1;
        }
        if let Some(map) = self.share_map_mut(slot) {
            *map.entry(slot.share.clone()).or_default() += 1;
        }
    }

    pub fn remove(&mut self, slot: &Slot) {
        let i = slot.state.index();
        let count = if slot.pending { &mut self.pending[i] } else { &mut self.by_state[i] };
        *count = count.saturating_sub(1);
        if slot.state.is_active() {
            decrement(&mut self.per_dn, &slot.subject);
        }
        let share = slot.share.clone();
        if let Some(map) = self.share_map_mut(slot) {
            decrement(map, &share);
        }
    }

    pub fn moved(&mut self, before: &Slot, after: &Slot) {
        if before != after {
            self.remove(before);
            self.add(after);
        }
    }

    fn share_map_mut(&mut self, slot: &Slot) -> Option<&mut BTreeMap<String, u32>> {
        if slot.pending {
            return None;
        }
        match slot.state {
            JobState::Preparing => Some(&mut self.preparing),
            JobState::Finishing => Some(&mut self.finishing),
            _ => None,
        }
    }

    /// Non-pending jobs in `state`.
    pub fn in_state(&self, state: JobState) -> u32 {
        self.by_state[state.index()]
    }

    pub fn pending_in(&self, state: JobState) -> u32 {
        self.pending[state.index()]
    }

    /// Jobs counted against the tracked-jobs cap, pending or not.
    pub fn tracked(&self) -> u32 {
        JobState::ALL
            .into_iter()
            .filter(|s| s.is_tracked())
            .map(|s| self.in_state(s) + self.pending_in(s))
            .sum()
    }

    pub fn running(&self) -> u32 {
        self.in_state(JobState::Submitting) + self.in_state(JobState::InLrms)
    }

    pub fn staging(&self) -> u32 {
        self.in_state(JobState::Preparing) + self.in_state(JobState::Finishing)
    }

    pub fn per_dn(&self, subject: &str) -> u32 {
        self.per_dn.get(subject).copied().unwrap_or(0)
    }

    pub fn share_occupancy(&self, direction: Direction, share: &str) -> u32 {
        self.share_map(direction).get(share).copied().unwrap_or(0)
    }

    /// Per-share occupancy, sorted by share.
    pub fn share_map(&self, direction: Direction) -> &BTreeMap<String, u32> {
        match direction {
            Direction::Download => &self.preparing,
            Direction::Upload => &self.finishing,
        }
    }

    /// Per-identity counts, sorted by identity.
    pub fn dn_counts(&self) -> Vec<(String, u32)> {
        self.per_dn.iter().map(|(dn, n)| (dn.clone(), *n)).collect()
    }
}

fn decrement(map: &mut BTreeMap<String, u32>, key: &str) {
    if let Some(count) = map.get_mut(key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            map.remove(key);
        }
    }
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;
