//! # Phase Schedule
//!
//! Behavioural parameters in force over successive phases of a run. Each
//! phase is keyed by the last day it covers; the phase in force on day `d` is
//! the one with the smallest threshold `>= d`. See [`PhaseSchedule::active_at`].

use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};

/// Storage-provider behaviour during one phase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehavioralPhase {
    /// Raw-byte power onboarded per day (PiB/day)
    pub onboarding_rate: f64,
    /// Quality-adjusted power per unit of raw power (>= 1)
    pub quality_factor: f64,
    /// Lifetime assigned to newly onboarded cohorts (days)
    pub sector_lifetime: u64,
    /// Fraction of existing power renewed per day
    pub renewal_rate: f64,
    /// Lifetime assigned to renewed capacity (days)
    pub renewal_lifetime: u64,
}

impl Default for BehavioralPhase {
    fn default() -> Self {
        Self {
            onboarding_rate: 10.0,
            quality_factor: 1.5,
            sector_lifetime: 360,
            renewal_rate: 0.005,
            renewal_lifetime: 360,
        }
    }
}

impl BehavioralPhase {
    /// A phase in which nothing is onboarded or renewed
    pub fn idle() -> Self {
        Self {
            onboarding_rate: 0.0,
            quality_factor: 1.0,
            sector_lifetime: 0,
            renewal_rate: 0.0,
            renewal_lifetime: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.onboarding_rate.is_finite() && self.onboarding_rate >= 0.0) {
            return Err(SimulationError::invalid(
                "onboarding_rate",
                format!("must be non-negative, got {}", self.onboarding_rate),
            ));
        }
        if !(self.quality_factor.is_finite() && self.quality_factor >= 1.0) {
            return Err(SimulationError::invalid(
                "quality_factor",
                format!("must be at least 1, got {}", self.quality_factor),
            ));
        }
        if !(self.renewal_rate.is_finite() && self.renewal_rate >= 0.0) {
            return Err(SimulationError::invalid(
                "renewal_rate",
                format!("must be non-negative, got {}", self.renewal_rate),
            ));
        }
        if self.onboarding_rate > 0.0 && self.sector_lifetime == 0 {
            return Err(SimulationError::invalid(
                "sector_lifetime",
                "must be at least one day when onboarding",
            ));
        }
        if self.renewal_rate > 0.0 && self.renewal_lifetime == 0 {
            return Err(SimulationError::invalid(
                "renewal_lifetime",
                "must be at least one day when renewing",
            ));
        }
        Ok(())
    }

    /// Share of every live cohort renewed during a tick of `delta_days`
    pub fn renew_share(&self, delta_days: u64) -> f64 {
        self.renewal_rate * delta_days as f64
    }
}

/// Sorted `(threshold_day, phase)` table
///
/// Serialized as the bare list of pairs; deserialization goes through
/// [`PhaseSchedule::new`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<(u64, BehavioralPhase)>",
    into = "Vec<(u64, BehavioralPhase)>"
)]
pub struct PhaseSchedule {
    phases: Vec<(u64, BehavioralPhase)>,
}

impl PhaseSchedule {
    /// Builds a schedule; thresholds must be unique
    pub fn new(phases: impl IntoIterator<Item = (u64, BehavioralPhase)>) -> Result<Self> {
        let mut phases: Vec<_> = phases.into_iter().collect();
        phases.sort_by_key(|(threshold, _)| *threshold);
        let schedule = Self { phases };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Non-empty, strictly increasing thresholds, every phase valid
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(SimulationError::invalid("phases", "at least one phase is required"));
        }
        if let Some(window) = self.phases.windows(2).find(|w| w[0].0 >= w[1].0) {
            let reason = if window[0].0 == window[1].0 {
                format!("duplicate threshold day {}", window[0].0)
            } else {
                format!("threshold day {} follows {}", window[1].0, window[0].0)
            };
            return Err(SimulationError::invalid("phases", reason));
        }
        for (_, phase) in &self.phases {
            phase.validate()?;
        }
        Ok(())
    }

    /// Single phase covering days `0..=until_day`
    pub fn constant(until_day: u64, phase: BehavioralPhase) -> Result<Self> {
        Self::new([(until_day, phase)])
    }

    /// Phase whose threshold is the smallest one `>= day`.
    ///
    /// A day equal to a threshold selects that threshold's phase, i.e. the
    /// boundary day belongs to the phase that ends on it.
    pub fn active_at(&self, day: u64) -> Result<&BehavioralPhase> {
        let idx = self.phases.partition_point(|(threshold, _)| *threshold < day);
        self.phases
            .get(idx)
            .map(|(_, phase)| phase)
            .ok_or(SimulationError::PhaseScheduleExhausted { day })
    }

    /// Fails unless every day up to `last_day` has a phase in force
    pub fn covers(&self, last_day: u64) -> Result<()> {
        match self.last_threshold() {
            Some(threshold) if threshold >= last_day => Ok(()),
            _ => Err(SimulationError::PhaseScheduleExhausted { day: last_day }),
        }
    }

    pub fn last_threshold(&self) -> Option<u64> {
        self.phases.last().map(|(threshold, _)| *threshold)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u64, BehavioralPhase)> {
        self.phases.iter()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Largest per-tick renewal share any phase can produce
    pub fn max_renew_share(&self, delta_days: u64) -> f64 {
        self.phases
            .iter()
            .map(|(_, phase)| phase.renew_share(delta_days))
            .fold(0.0, f64::max)
    }
}

impl TryFrom<Vec<(u64, BehavioralPhase)>> for PhaseSchedule {
    type Error = SimulationError;

    fn try_from(phases: Vec<(u64, BehavioralPhase)>) -> Result<Self> {
        Self::new(phases)
    }
}

impl From<PhaseSchedule> for Vec<(u64, BehavioralPhase)> {
    fn from(schedule: PhaseSchedule) -> Self {
        schedule.phases
    }
}
