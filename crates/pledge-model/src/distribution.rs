//! # Token Distribution Ledger
//!
//! Supply accounting, updated once per tick.
//!
//! ```text
//! available   = minted + vested − burned
//! locked      = Σ collateral + Σ pending schedule entries   (live cohorts)
//! circulating = available − locked
//! ```
//!
//! `locked` is always rederived from the cohort ledger. The update also
//! rebuilds `circulating` from the tick's flows and rejects the tick if the
//! two figures drift apart.

use crate::cohort::CohortLedger;
use crate::constants::CONSERVATION_TOLERANCE;
use crate::error::{Result, SimulationError, Stage};
use serde::{Deserialize, Serialize};

/// Token movements recorded during one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickFlows {
    /// Block reward minted
    pub minted: f64,
    pub vested: f64,
    pub burned: f64,
    /// Reward paid straight into circulation
    pub immediate_release: f64,
    /// Reward with no live cohort to receive it; circulates immediately
    pub unallocated_reward: f64,
    /// Reward added to cohort unlock schedules
    pub reward_locked: f64,
    /// Pledge taken out of circulation by onboarding and renewal top-ups
    pub pledge_locked: f64,
    /// Schedule entries that came due
    pub schedule_released: f64,
    /// Pledges and pending rewards of cohorts that expired
    pub expiry_released: f64,
}

impl TickFlows {
    /// Net change in circulating supply implied by these flows
    pub fn circulating_delta(&self) -> f64 {
        self.immediate_release
            + self.unallocated_reward
            + self.vested
            + self.schedule_released
            + self.expiry_released
            - self.burned
            - self.pledge_locked
    }

    /// Net change in locked supply implied by these flows
    pub fn locked_delta(&self) -> f64 {
        self.pledge_locked + self.reward_locked - self.schedule_released - self.expiry_released
    }
}

/// Supply figures at the end of a tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDistribution {
    /// Cumulative minted tokens
    pub minted: f64,
    /// Cumulative tokens released by the vesting schedule
    pub vested: f64,
    /// Cumulative burned tokens
    pub burned: f64,
    pub circulating: f64,
    pub locked: f64,
    /// Part of `locked` held as storage and consensus pledge
    pub locked_collateral: f64,
    /// Part of `locked` waiting in reward schedules
    pub locked_rewards: f64,
}

impl TokenDistribution {
    /// Starting distribution for a given genesis ledger
    pub fn genesis(minted: f64, vested: f64, burned: f64, ledger: &CohortLedger) -> Self {
        let locked_collateral = ledger.collateral();
        let locked_rewards = ledger.scheduled_rewards();
        let locked = locked_collateral + locked_rewards;
        Self {
            minted,
            vested,
            burned,
            circulating: minted + vested - burned - locked,
            locked,
            locked_collateral,
            locked_rewards,
        }
    }

    pub fn available(&self) -> f64 {
        self.minted + self.vested - self.burned
    }

    /// Fraction of available supply that is locked
    pub fn locked_fraction(&self) -> f64 {
        let available = self.available();
        if available > 0.0 {
            self.locked / available
        } else {
            0.0
        }
    }

    /// Residual of `available == circulating + locked`
    pub fn conservation_error(&self) -> f64 {
        self.available() - self.circulating - self.locked
    }

    /// Distribution after a tick with the given flows, against the tick's
    /// final cohort ledger
    pub fn update(&self, flows: &TickFlows, ledger: &CohortLedger, tick: u64) -> Result<Self> {
        let minted = self.minted + flows.minted;
        let vested = self.vested + flows.vested;
        let burned = self.burned + flows.burned;

        let locked_collateral = ledger.collateral();
        let locked_rewards = ledger.scheduled_rewards();
        let locked = locked_collateral + locked_rewards;
        let circulating = minted + vested - burned - locked;

        let next = Self {
            minted,
            vested,
            burned,
            circulating,
            locked,
            locked_collateral,
            locked_rewards,
        };

        let scale = next.available().abs().max(1.0);
        let tolerance = CONSERVATION_TOLERANCE * scale;

        let allocated = flows.immediate_release + flows.unallocated_reward + flows.reward_locked;
        if (allocated - flows.minted).abs() > tolerance {
            return Err(SimulationError::LedgerInvariant {
                tick,
                stage: Stage::Distribution,
                detail: format!(
                    "allocated reward {allocated} differs from minted reward {}",
                    flows.minted
                ),
            });
        }

        let expected_locked = self.locked + flows.locked_delta();
        if (expected_locked - locked).abs() > tolerance {
            return Err(SimulationError::LedgerInvariant {
                tick,
                stage: Stage::Distribution,
                detail: format!("locked supply {locked} differs from flow total {expected_locked}"),
            });
        }

        let expected_circulating = self.circulating + flows.circulating_delta();
        if (expected_circulating - circulating).abs() > tolerance {
            return Err(SimulationError::LedgerInvariant {
                tick,
                stage: Stage::Distribution,
                detail: format!(
                    "circulating supply {circulating} differs from flow total {expected_circulating}"
                ),
            });
        }

        Ok(next)
    }
}
