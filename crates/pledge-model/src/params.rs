//! Simulation parameters, fixed for the duration of a run

use crate::constants::*;
use crate::error::{Result, SimulationError};
use crate::issuance::{BaselineMinting, SimpleMinting};
use crate::phase::PhaseSchedule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit conversions threaded through the engine
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub days_per_year: f64,
}

impl Default for TimeUnits {
    fn default() -> Self {
        Self {
            days_per_year: DAYS_PER_YEAR,
        }
    }
}

impl TimeUnits {
    pub fn days_to_years(&self, days: u64) -> f64 {
        days as f64 / self.days_per_year
    }
}

/// Every input of a run besides the initial state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Fraction of circulating supply the consensus pledge aims to lock
    pub target_locked_supply: f64,
    pub simple_mechanism: SimpleMinting,
    pub baseline_mechanism: BaselineMinting,
    /// Days over which locked rewards unlock linearly
    pub linear_duration: u64,
    /// Fraction of each reward paid out immediately
    pub immediate_release_fraction: f64,
    /// Days of expected reward a storage pledge covers
    pub storage_pledge_days: f64,
    /// Day -> tokens vested that day
    pub vesting_schedule: BTreeMap<u64, f64>,
    /// Day -> tokens burned that day
    pub burn_schedule: BTreeMap<u64, f64>,
    pub phases: PhaseSchedule,
    /// Tick size in days
    pub delta_days: u64,
    /// Cap power at the baseline when integrating capped power
    pub baseline_activated: bool,
    pub time: TimeUnits,
}

impl SimulationParameters {
    /// Reference economics around a caller-supplied phase schedule
    pub fn with_phases(phases: PhaseSchedule) -> Self {
        Self {
            target_locked_supply: TARGET_LOCKED_SUPPLY,
            simple_mechanism: SimpleMinting::default(),
            baseline_mechanism: BaselineMinting::default(),
            linear_duration: LINEAR_DURATION_DAYS,
            immediate_release_fraction: IMMEDIATE_RELEASE_FRACTION,
            storage_pledge_days: STORAGE_PLEDGE_DAYS,
            vesting_schedule: BTreeMap::new(),
            burn_schedule: BTreeMap::new(),
            phases,
            delta_days: 1,
            baseline_activated: true,
            time: TimeUnits::default(),
        }
    }

    /// Checks ranges that do not depend on run length
    pub fn validate(&self) -> Result<()> {
        self.simple_mechanism.validate()?;
        self.baseline_mechanism.validate()?;
        self.phases.validate()?;

        if !(0.0..=1.0).contains(&self.target_locked_supply) {
            return Err(SimulationError::invalid(
                "target_locked_supply",
                format!("must be within [0, 1], got {}", self.target_locked_supply),
            ));
        }
        if !(0.0..=1.0).contains(&self.immediate_release_fraction) {
            return Err(SimulationError::invalid(
                "immediate_release_fraction",
                format!("must be within [0, 1], got {}", self.immediate_release_fraction),
            ));
        }
        if self.linear_duration == 0 {
            return Err(SimulationError::invalid("linear_duration", "must be at least one day"));
        }
        if !(self.storage_pledge_days.is_finite() && self.storage_pledge_days >= 0.0) {
            return Err(SimulationError::invalid(
                "storage_pledge_days",
                format!("must be non-negative, got {}", self.storage_pledge_days),
            ));
        }
        if self.delta_days == 0 {
            return Err(SimulationError::invalid("delta_days", "must be at least one day"));
        }
        if !(self.time.days_per_year.is_finite() && self.time.days_per_year > 0.0) {
            return Err(SimulationError::invalid(
                "days_per_year",
                format!("must be positive, got {}", self.time.days_per_year),
            ));
        }
        let day_schedules = [
            ("vesting_schedule", &self.vesting_schedule),
            ("burn_schedule", &self.burn_schedule),
        ];
        for (name, schedule) in day_schedules {
            let invalid = schedule.iter().find(|(_, a)| !(a.is_finite() && **a >= 0.0));
            if let Some((day, amount)) = invalid {
                return Err(SimulationError::invalid(
                    name,
                    format!("amount on day {day} must be non-negative, got {amount}"),
                ));
            }
        }

        let max_share = self.phases.max_renew_share(self.delta_days);
        if max_share > 1.0 {
            return Err(SimulationError::invalid(
                "renewal_rate",
                format!("renews {max_share} of every cohort per tick; at most 1 is possible"),
            ));
        }
        Ok(())
    }

    /// Full validation for a run of `num_ticks` ticks starting at `start_day`
    pub fn validate_run(&self, start_day: u64, num_ticks: u64) -> Result<()> {
        self.validate()?;
        let last_day = num_ticks
            .checked_mul(self.delta_days)
            .and_then(|d| d.checked_add(start_day))
            .ok_or_else(|| {
                SimulationError::invalid("ticks", "run length overflows the day counter")
            })?;
        self.phases.covers(last_day)
    }

    /// Tokens vested on days in `(after_day, through_day]`
    pub fn vested_between(&self, after_day: u64, through_day: u64) -> f64 {
        sum_between(&self.vesting_schedule, after_day, through_day)
    }

    /// Tokens burned on days in `(after_day, through_day]`
    pub fn burned_between(&self, after_day: u64, through_day: u64) -> f64 {
        sum_between(&self.burn_schedule, after_day, through_day)
    }

    pub fn delta_years(&self) -> f64 {
        self.time.days_to_years(self.delta_days)
    }
}

fn sum_between(schedule: &BTreeMap<u64, f64>, after_day: u64, through_day: u64) -> f64 {
    if through_day <= after_day {
        return 0.0;
    }
    schedule.range(after_day + 1..=through_day).map(|(_, amount)| amount).sum()
}
