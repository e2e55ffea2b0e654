//! Per-tick state and the snapshot records a run emits

use crate::cohort::{AggregateSector, CohortLedger};
use crate::distribution::{TickFlows, TokenDistribution};
use crate::issuance::Reward;
use crate::params::SimulationParameters;
use crate::phase::BehavioralPhase;
use serde::{Deserialize, Serialize};

/// Network-level figures derived from the cohort ledger and the minting
/// mechanisms
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Raw-byte power (PiB)
    pub power_rb: f64,
    /// Quality-adjusted power (QA PiB)
    pub power_qa: f64,
    /// Baseline power at the current day (PiB)
    pub baseline: f64,
    /// Time integral of capped power (PiB·years)
    pub cumm_capped_power: f64,
    /// Effective network time (years)
    pub effective_network_time: f64,
}

/// Collateral required per unit of newly committed quality-adjusted power
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PledgeRates {
    pub consensus_pledge_per_qa_power: f64,
    pub storage_pledge_per_qa_power: f64,
}

impl PledgeRates {
    /// Total pledge for `power_qa` of new capacity
    pub fn pledge_for(&self, power_qa: f64) -> (f64, f64) {
        (
            self.storage_pledge_per_qa_power * power_qa,
            self.consensus_pledge_per_qa_power * power_qa,
        )
    }
}

/// Supply and cohorts a run starts from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    pub minted: f64,
    pub vested: f64,
    pub burned: f64,
    pub cohorts: Vec<AggregateSector>,
}

/// Complete system state at the end of a tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub tick: u64,
    pub days_passed: u64,
    /// Phase in force during this tick; `None` before the first tick
    pub phase: Option<BehavioralPhase>,
    pub network: NetworkState,
    pub reward: Reward,
    pub pledge_rates: PledgeRates,
    pub distribution: TokenDistribution,
    /// Token movements of the tick that produced this state
    pub flows: TickFlows,
    pub ledger: CohortLedger,
}

impl SimulationState {
    /// Tick-zero state for the given starting conditions
    pub fn genesis(params: &SimulationParameters, initial: InitialConditions) -> Self {
        let ledger = CohortLedger::with_cohorts(initial.cohorts);
        let distribution =
            TokenDistribution::genesis(initial.minted, initial.vested, initial.burned, &ledger);
        let network = NetworkState {
            power_rb: ledger.power_rb(),
            power_qa: ledger.power_qa(),
            baseline: params.baseline_mechanism.baseline_function(0.0),
            cumm_capped_power: 0.0,
            effective_network_time: 0.0,
        };

        Self {
            tick: 0,
            days_passed: 0,
            phase: None,
            network,
            reward: Reward::default(),
            pledge_rates: PledgeRates::default(),
            distribution,
            flows: TickFlows::default(),
            ledger,
        }
    }

    /// Summary record of this state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            days_passed: self.days_passed,
            power_rb: self.network.power_rb,
            power_qa: self.network.power_qa,
            baseline: self.network.baseline,
            cumm_capped_power: self.network.cumm_capped_power,
            effective_network_time: self.network.effective_network_time,
            reward: self.reward,
            block_reward: self.reward.block_reward(),
            consensus_pledge_per_qa_power: self.pledge_rates.consensus_pledge_per_qa_power,
            storage_pledge_per_qa_power: self.pledge_rates.storage_pledge_per_qa_power,
            distribution: self.distribution,
            flows: self.flows,
            live_cohorts: self.ledger.live_count(),
            expired_cohorts: self.ledger.tombstones().count(),
        }
    }
}

/// One row of run output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub days_passed: u64,
    pub power_rb: f64,
    pub power_qa: f64,
    pub baseline: f64,
    pub cumm_capped_power: f64,
    pub effective_network_time: f64,
    pub reward: Reward,
    pub block_reward: f64,
    pub consensus_pledge_per_qa_power: f64,
    pub storage_pledge_per_qa_power: f64,
    pub distribution: TokenDistribution,
    pub flows: TickFlows,
    pub live_cohorts: usize,
    /// Cohorts that expired during this tick
    pub expired_cohorts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseSchedule;

    #[test]
    fn test_genesis_state() {
        let params = SimulationParameters::with_phases(
            PhaseSchedule::constant(10, BehavioralPhase::default()).unwrap(),
        );
        let initial = InitialConditions {
            minted: 500.0,
            vested: 100.0,
            burned: 0.0,
            cohorts: vec![AggregateSector::onboarded(10.0, 20.0, 100, 5.0, 15.0)],
        };

        let state = SimulationState::genesis(&params, initial);
        let snapshot = state.snapshot();

        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.power_rb, 10.0);
        assert_eq!(snapshot.power_qa, 20.0);
        assert_eq!(snapshot.baseline, params.baseline_mechanism.initial_baseline);
        assert_eq!(snapshot.distribution.locked, 20.0);
        assert_eq!(snapshot.distribution.circulating, 580.0);
        assert_eq!(snapshot.live_cohorts, 1);
        assert_eq!(snapshot.block_reward, 0.0);
    }

    #[test]
    fn test_pledge_for() {
        let rates = PledgeRates {
            consensus_pledge_per_qa_power: 2.0,
            storage_pledge_per_qa_power: 0.5,
        };
        assert_eq!(rates.pledge_for(4.0), (2.0, 8.0));
    }
}
