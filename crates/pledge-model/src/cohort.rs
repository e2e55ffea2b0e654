//! # Cohort Ledger
//!
//! Aggregate sectors ("cohorts") tracked as an arena of entries with stable
//! identifiers. Each tick works on a fresh generation produced by
//! [`CohortLedger::next_generation`]: live cohorts are copied forward,
//! tombstones of the previous generation are dropped, and nothing is shared
//! with the snapshot the generation was derived from.
//!
//! ```text
//! generation n        generation n+1
//! #1 live   ───────►  #1 live  (renewal share split off)
//! #2 live   ───────►  #2 expired (tombstone, released into circulation)
//! #3 expired   ✗      #4 onboarded
//!                     #5 renewed
//! ```

use crate::error::{Result, SimulationError, Stage};
use crate::schedule::RewardSchedule;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable cohort identifier, unique within a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CohortId(pub u64);

impl fmt::Display for CohortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a cohort entered the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortOrigin {
    Genesis,
    Onboarded,
    Renewed,
}

/// A batch of capacity onboarded or renewed together
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSector {
    /// Raw-byte power (PiB)
    pub power_rb: f64,
    /// Quality-adjusted power (QA PiB), never below `power_rb`
    pub power_qa: f64,
    /// Days left before expiry; zero or below means expired
    pub remaining_days: i64,
    pub storage_pledge: f64,
    pub consensus_pledge: f64,
    /// Locked rewards and their unlock days
    pub reward_schedule: RewardSchedule,
    pub origin: CohortOrigin,
}

impl AggregateSector {
    /// A freshly onboarded cohort with an empty reward schedule
    pub fn onboarded(
        power_rb: f64,
        power_qa: f64,
        lifetime_days: u64,
        storage_pledge: f64,
        consensus_pledge: f64,
    ) -> Self {
        Self {
            power_rb,
            power_qa,
            remaining_days: lifetime_as_days(lifetime_days),
            storage_pledge,
            consensus_pledge,
            reward_schedule: RewardSchedule::new(),
            origin: CohortOrigin::Onboarded,
        }
    }

    /// Implied quality multiplier
    pub fn quality_factor(&self) -> f64 {
        if self.power_rb > 0.0 {
            self.power_qa / self.power_rb
        } else {
            1.0
        }
    }

    /// Storage plus consensus pledge
    pub fn collateral(&self) -> f64 {
        self.storage_pledge + self.consensus_pledge
    }

    /// Everything this cohort keeps out of circulation
    pub fn locked(&self) -> f64 {
        self.collateral() + self.reward_schedule.total()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_days <= 0
    }

    /// Splits `share` of power, pledges and every schedule entry off this
    /// cohort
    pub fn split_off(&mut self, share: f64) -> RenewalShare {
        let power_rb = self.power_rb * share;
        let power_qa = self.power_qa * share;
        let storage_pledge = self.storage_pledge * share;
        let consensus_pledge = self.consensus_pledge * share;

        self.power_rb -= power_rb;
        self.power_qa -= power_qa;
        self.storage_pledge -= storage_pledge;
        self.consensus_pledge -= consensus_pledge;

        RenewalShare {
            power_rb,
            power_qa,
            storage_pledge,
            consensus_pledge,
            reward_schedule: self.reward_schedule.extract_share(share),
        }
    }

    /// Fails on any negative balance
    pub fn check_balances(&self, tick: u64, stage: Stage, id: CohortId) -> Result<()> {
        let fields = [
            ("power_rb", self.power_rb),
            ("power_qa", self.power_qa),
            ("storage_pledge", self.storage_pledge),
            ("consensus_pledge", self.consensus_pledge),
        ];
        for (field, value) in fields {
            if value < 0.0 {
                return Err(SimulationError::NegativeBalance {
                    tick,
                    stage,
                    cohort: id,
                    field,
                    value,
                });
            }
        }
        if let Some((_, value)) = self.reward_schedule.iter().find(|(_, v)| *v < 0.0) {
            return Err(SimulationError::NegativeBalance {
                tick,
                stage,
                cohort: id,
                field: "reward_schedule",
                value,
            });
        }
        Ok(())
    }
}

fn lifetime_as_days(days: u64) -> i64 {
    i64::try_from(days).unwrap_or(i64::MAX)
}

/// Capacity and obligations split off live cohorts during renewal
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenewalShare {
    pub power_rb: f64,
    pub power_qa: f64,
    pub storage_pledge: f64,
    pub consensus_pledge: f64,
    pub reward_schedule: RewardSchedule,
}

impl RenewalShare {
    /// Pledge carried over from the source cohorts
    pub fn legacy_pledge(&self) -> f64 {
        self.storage_pledge + self.consensus_pledge
    }

    fn absorb(&mut self, other: RenewalShare) {
        self.power_rb += other.power_rb;
        self.power_qa += other.power_qa;
        self.storage_pledge += other.storage_pledge;
        self.consensus_pledge += other.consensus_pledge;
        self.reward_schedule.merge(&other.reward_schedule);
    }
}

/// Result of the expiry stage
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpiryOutcome {
    pub expired: Vec<CohortId>,
    /// Pledges released by expired cohorts
    pub released_collateral: f64,
    /// Unpaid schedule entries released by expired cohorts
    pub released_rewards: f64,
}

impl ExpiryOutcome {
    pub fn released(&self) -> f64 {
        self.released_collateral + self.released_rewards
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Slot {
    Live(AggregateSector),
    /// Removed this generation; `released` is what it held when it expired
    Expired { released: f64 },
}

/// Arena entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortEntry {
    pub id: CohortId,
    /// Generation in which the cohort was created
    pub born: u64,
    slot: Slot,
}

impl CohortEntry {
    pub fn sector(&self) -> Option<&AggregateSector> {
        match &self.slot {
            Slot::Live(sector) => Some(sector),
            Slot::Expired { .. } => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.slot, Slot::Live(_))
    }
}

/// Arena of aggregate sectors
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortLedger {
    generation: u64,
    next_id: u64,
    entries: Vec<CohortEntry>,
}

impl CohortLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with genesis cohorts
    pub fn with_cohorts(cohorts: impl IntoIterator<Item = AggregateSector>) -> Self {
        let mut ledger = Self::new();
        for cohort in cohorts {
            ledger.insert(cohort);
        }
        ledger
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Copies live cohorts into a new generation, dropping tombstones
    pub fn next_generation(&self) -> Self {
        Self {
            generation: self.generation + 1,
            next_id: self.next_id,
            entries: self.entries.iter().filter(|e| e.is_live()).cloned().collect(),
        }
    }

    pub fn insert(&mut self, sector: AggregateSector) -> CohortId {
        let id = CohortId(self.next_id);
        self.next_id += 1;
        self.entries.push(CohortEntry {
            id,
            born: self.generation,
            slot: Slot::Live(sector),
        });
        id
    }

    pub fn get(&self, id: CohortId) -> Option<&AggregateSector> {
        self.entries.iter().find(|e| e.id == id).and_then(CohortEntry::sector)
    }

    /// Live cohorts in insertion order
    pub fn live(&self) -> impl Iterator<Item = (CohortId, &AggregateSector)> {
        self.entries.iter().filter_map(|e| e.sector().map(|s| (e.id, s)))
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = (CohortId, &mut AggregateSector)> {
        self.entries.iter_mut().filter_map(|e| match &mut e.slot {
            Slot::Live(sector) => Some((e.id, sector)),
            Slot::Expired { .. } => None,
        })
    }

    /// Cohorts removed during the current generation, with what they released
    pub fn tombstones(&self) -> impl Iterator<Item = (CohortId, f64)> + '_ {
        self.entries.iter().filter_map(|e| match e.slot {
            Slot::Expired { released } => Some((e.id, released)),
            Slot::Live(_) => None,
        })
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    pub fn power_rb(&self) -> f64 {
        self.live().map(|(_, s)| s.power_rb).sum()
    }

    pub fn power_qa(&self) -> f64 {
        self.live().map(|(_, s)| s.power_qa).sum()
    }

    /// Storage plus consensus pledge across live cohorts
    pub fn collateral(&self) -> f64 {
        self.live().map(|(_, s)| s.collateral()).sum()
    }

    /// Pending schedule entries across live cohorts
    pub fn scheduled_rewards(&self) -> f64 {
        self.live().map(|(_, s)| s.reward_schedule.total()).sum()
    }

    pub fn locked(&self) -> f64 {
        self.collateral() + self.scheduled_rewards()
    }

    /// Splits `share` off every live cohort and accumulates the pieces
    pub fn split_renewals(&mut self, share: f64) -> RenewalShare {
        let mut total = RenewalShare::default();
        for (_, sector) in self.live_mut() {
            total.absorb(sector.split_off(share));
        }
        total
    }

    /// Ages live cohorts by `delta_days` and tombstones those whose lifetime
    /// is exhausted.
    ///
    /// Cohorts created in the current generation start aging next tick, so a
    /// cohort created on day `d` with lifetime `L` is removed on day `d + L`.
    pub fn expire(&mut self, delta_days: u64) -> ExpiryOutcome {
        let delta = lifetime_as_days(delta_days);
        let generation = self.generation;
        let mut outcome = ExpiryOutcome::default();
        for entry in &mut self.entries {
            if entry.born == generation {
                continue;
            }
            let Slot::Live(sector) = &mut entry.slot else {
                continue;
            };
            sector.remaining_days = sector.remaining_days.saturating_sub(delta);
            if sector.is_expired() {
                let collateral = sector.collateral();
                let rewards = sector.reward_schedule.total();
                outcome.released_collateral += collateral;
                outcome.released_rewards += rewards;
                outcome.expired.push(entry.id);
                entry.slot = Slot::Expired {
                    released: collateral + rewards,
                };
            }
        }
        outcome
    }

    /// Fails on the first live cohort with a negative balance
    pub fn check_balances(&self, tick: u64, stage: Stage) -> Result<()> {
        for (id, sector) in self.live() {
            sector.check_balances(tick, stage, id)?;
        }
        Ok(())
    }
}
