//! # Reward Schedule
//!
//! Per-cohort mapping from absolute day to the amount of locked reward that
//! unlocks on that day.
//!
//! ```text
//! prune(day 1)      {0: 5, 1: 10, 2: 20}  -> {2: 20}      released 15
//! merge_linear      {2: 20} + 15 over 3d from day 1
//!                                         -> {1: 5, 2: 25, 3: 5}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered day -> pending amount map
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSchedule {
    entries: BTreeMap<u64, f64>,
}

impl RewardSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Amount pending on a given day
    pub fn get(&self, day: u64) -> f64 {
        self.entries.get(&day).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.entries.iter().map(|(day, amount)| (*day, *amount))
    }

    /// Earliest day with a pending entry
    pub fn first_day(&self) -> Option<u64> {
        self.entries.keys().next().copied()
    }

    /// Sum of all pending entries
    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Adds `amount` to the entry for `day`
    pub fn add(&mut self, day: u64, amount: f64) {
        if amount == 0.0 {
            return;
        }
        *self.entries.entry(day).or_insert(0.0) += amount;
    }

    /// Additive union with another schedule
    pub fn merge(&mut self, other: &RewardSchedule) {
        for (day, amount) in other.iter() {
            self.add(day, amount);
        }
    }

    /// Spreads `amount` evenly over `duration` consecutive days starting at
    /// `start_day` and merges the result. Returns the amount scheduled.
    pub fn merge_linear(&mut self, start_day: u64, duration: u64, amount: f64) -> f64 {
        if duration == 0 || amount == 0.0 {
            return 0.0;
        }
        let daily = amount / duration as f64;
        for offset in 0..duration {
            self.add(start_day + offset, daily);
        }
        daily * duration as f64
    }

    /// Drops every entry at or before `day`, returning the released total
    pub fn prune(&mut self, day: u64) -> f64 {
        let pending = match day.checked_add(1) {
            Some(next) => self.entries.split_off(&next),
            None => BTreeMap::new(),
        };
        let released = self.entries.values().sum();
        self.entries = pending;
        released
    }

    /// Moves `share` of every entry into a new schedule
    pub fn extract_share(&mut self, share: f64) -> RewardSchedule {
        let mut extracted = RewardSchedule::new();
        for (day, amount) in self.entries.iter_mut() {
            let moved = *amount * share;
            *amount -= moved;
            extracted.add(*day, moved);
        }
        extracted
    }
}

impl FromIterator<(u64, f64)> for RewardSchedule {
    fn from_iter<I: IntoIterator<Item = (u64, f64)>>(iter: I) -> Self {
        let mut schedule = RewardSchedule::new();
        for (day, amount) in iter {
            schedule.add(day, amount);
        }
        schedule
    }
}
