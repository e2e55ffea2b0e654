//! # Simulation Engine
//!
//! Executes the per-tick pipeline. Every stage consumes the output of the one
//! before it, so the order below is fixed:
//!
//! ```text
//! For each tick:
//! 1. Advance time by `delta_days`, select the phase in force
//! 2. Resum power over live cohorts, recompute baseline, capped power and
//!    effective network time
//! 3. Block reward and per-unit pledge rates (priced off the network as it
//!    stood before this tick's cohorts are added)
//! 4. Onboard a fresh cohort
//! 5. Renew a share of every live cohort into one new cohort
//! 6. Age cohorts and expire exhausted ones
//! 7. Split the block reward into immediate payouts and unlock schedules
//! 8. Update the token distribution
//! ```
//!
//! The engine never mutates the previous [`SimulationState`]; cohort changes
//! happen on a new ledger generation owned by the state being built.

use crate::cohort::{AggregateSector, CohortLedger, CohortOrigin};
use crate::distribution::TickFlows;
use crate::error::{Result, SimulationError, Stage};
use crate::issuance::{Issuance, Reward};
use crate::params::SimulationParameters;
use crate::phase::BehavioralPhase;
use crate::state::{NetworkState, PledgeRates, SimulationState};
use tracing::{debug, trace};

/// Stateless executor of the tick pipeline for one parameter set
#[derive(Clone, Debug)]
pub struct SimulationEngine {
    params: SimulationParameters,
}

impl SimulationEngine {
    /// Validates the parameters and builds an engine
    pub fn new(params: SimulationParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Produces the state one tick after `prev`
    pub fn step(&self, prev: &SimulationState) -> Result<SimulationState> {
        let params = &self.params;
        let tick = prev.tick + 1;

        // 1. Time and phase
        let days_passed = prev
            .days_passed
            .checked_add(params.delta_days)
            .ok_or_else(|| SimulationError::LedgerInvariant {
                tick,
                stage: Stage::Time,
                detail: "day counter overflow".to_string(),
            })?;
        let phase = params.phases.active_at(days_passed)?.clone();

        let mut ledger = prev.ledger.next_generation();

        // 2. Network
        let network = self.network(prev, &ledger, days_passed);

        // 3. Pricing
        let reward = self.reward(prev, days_passed, &network);
        let pledge_rates = self.pledge_rates(tick, prev, &network, &reward, &phase, &ledger)?;

        let mut flows = TickFlows {
            minted: reward.block_reward(),
            vested: params.vested_between(prev.days_passed, days_passed),
            burned: params.burned_between(prev.days_passed, days_passed),
            ..TickFlows::default()
        };

        // 4. Onboarding
        flows.pledge_locked += self.onboard(&mut ledger, &phase, &pledge_rates);

        // 5. Renewal
        flows.pledge_locked += self.renew(tick, &mut ledger, &phase, &pledge_rates)?;

        // 6. Expiry
        let expiry = ledger.expire(params.delta_days);
        for id in &expiry.expired {
            trace!(tick, cohort = %id, "cohort expired");
        }
        flows.expiry_released = expiry.released();

        // 7. Reward scheduling
        let prev_day = prev.days_passed;
        self.schedule_rewards(tick, prev_day, days_passed, &mut ledger, &reward, &mut flows)?;

        // 8. Distribution
        let distribution = prev.distribution.update(&flows, &ledger, tick)?;

        debug!(
            tick,
            day = days_passed,
            power_rb = network.power_rb,
            power_qa = network.power_qa,
            block_reward = reward.block_reward(),
            circulating = distribution.circulating,
            locked = distribution.locked,
            cohorts = ledger.live_count(),
            "tick complete"
        );

        Ok(SimulationState {
            tick,
            days_passed,
            phase: Some(phase),
            network,
            reward,
            pledge_rates,
            distribution,
            flows,
            ledger,
        })
    }

    fn network(
        &self,
        prev: &SimulationState,
        ledger: &CohortLedger,
        days_passed: u64,
    ) -> NetworkState {
        let params = &self.params;
        let power_rb = ledger.power_rb();
        let power_qa = ledger.power_qa();

        let baseline = params
            .baseline_mechanism
            .baseline_function(params.time.days_to_years(days_passed));

        let capped_power = if params.baseline_activated {
            power_rb.min(baseline)
        } else {
            baseline
        };
        let cumm_capped_power =
            prev.network.cumm_capped_power + capped_power * params.delta_years();
        let effective_network_time = params
            .baseline_mechanism
            .effective_network_time(cumm_capped_power);

        NetworkState {
            power_rb,
            power_qa,
            baseline,
            cumm_capped_power,
            effective_network_time,
        }
    }

    fn reward(&self, prev: &SimulationState, days_passed: u64, network: &NetworkState) -> Reward {
        let params = &self.params;
        let simple = params.simple_mechanism.issued_between(
            params.time.days_to_years(prev.days_passed),
            params.time.days_to_years(days_passed),
        );
        let baseline = params.baseline_mechanism.issued_between(
            prev.network.effective_network_time,
            network.effective_network_time,
        );
        Reward::new(simple, baseline)
    }

    fn pledge_rates(
        &self,
        tick: u64,
        prev: &SimulationState,
        network: &NetworkState,
        reward: &Reward,
        phase: &BehavioralPhase,
        ledger: &CohortLedger,
    ) -> Result<PledgeRates> {
        let params = &self.params;

        let consensus_base = network.baseline.max(network.power_qa);
        if consensus_base <= 0.0 {
            return Err(SimulationError::DegenerateState {
                tick,
                stage: Stage::Pricing,
                quantity: "max(baseline, power_qa)",
            });
        }
        let consensus_pledge_per_qa_power =
            params.target_locked_supply * prev.distribution.circulating / consensus_base;

        let storage_pledge_per_qa_power = if network.power_qa > 0.0 {
            let daily_reward = reward.block_reward() / params.delta_days as f64;
            params.storage_pledge_days * daily_reward / network.power_qa
        } else if phase.onboarding_rate > 0.0 || ledger.collateral() > 0.0 {
            return Err(SimulationError::DegenerateState {
                tick,
                stage: Stage::Pricing,
                quantity: "power_qa",
            });
        } else {
            // nothing will be priced this tick
            0.0
        };

        Ok(PledgeRates {
            consensus_pledge_per_qa_power,
            storage_pledge_per_qa_power,
        })
    }

    /// Returns the pledge locked by the new cohort
    fn onboard(
        &self,
        ledger: &mut CohortLedger,
        phase: &BehavioralPhase,
        rates: &PledgeRates,
    ) -> f64 {
        let power_rb = phase.onboarding_rate * self.params.delta_days as f64;
        if power_rb <= 0.0 {
            return 0.0;
        }
        let power_qa = power_rb * phase.quality_factor;
        let (storage_pledge, consensus_pledge) = rates.pledge_for(power_qa);

        let id = ledger.insert(AggregateSector::onboarded(
            power_rb,
            power_qa,
            phase.sector_lifetime,
            storage_pledge,
            consensus_pledge,
        ));
        trace!(
            cohort = %id,
            power_rb,
            power_qa,
            storage_pledge,
            consensus_pledge,
            "cohort onboarded"
        );

        storage_pledge + consensus_pledge
    }

    /// Returns the pledge added on top of what the renewed capacity carried
    fn renew(
        &self,
        tick: u64,
        ledger: &mut CohortLedger,
        phase: &BehavioralPhase,
        rates: &PledgeRates,
    ) -> Result<f64> {
        let renew_share = phase.renew_share(self.params.delta_days);
        if renew_share <= 0.0 || ledger.is_empty() {
            return Ok(0.0);
        }

        let renewed = ledger.split_renewals(renew_share);
        ledger.check_balances(tick, Stage::Renewal)?;

        let legacy_pledge = renewed.legacy_pledge();
        let (mut storage_pledge, mut consensus_pledge) = rates.pledge_for(renewed.power_qa);
        let mut top_up = storage_pledge + consensus_pledge - legacy_pledge;
        if top_up < 0.0 {
            // collateral never shrinks on renewal
            debug!(
                tick,
                legacy_pledge,
                repriced = storage_pledge + consensus_pledge,
                "renewal keeps legacy pledge"
            );
            storage_pledge = renewed.storage_pledge;
            consensus_pledge = renewed.consensus_pledge;
            top_up = 0.0;
        }

        let id = ledger.insert(AggregateSector {
            power_rb: renewed.power_rb,
            power_qa: renewed.power_qa,
            remaining_days: i64::try_from(phase.renewal_lifetime).unwrap_or(i64::MAX),
            storage_pledge,
            consensus_pledge,
            reward_schedule: renewed.reward_schedule,
            origin: CohortOrigin::Renewed,
        });
        trace!(tick, cohort = %id, renew_share, top_up, "cohort renewed");

        Ok(top_up)
    }

    /// Entries on days up to `prev_day` were released last tick, so any left
    /// over are stale.
    fn schedule_rewards(
        &self,
        tick: u64,
        prev_day: u64,
        days_passed: u64,
        ledger: &mut CohortLedger,
        reward: &Reward,
        flows: &mut TickFlows,
    ) -> Result<()> {
        let params = &self.params;
        let block_reward = reward.block_reward();
        let total_qa = ledger.power_qa();

        if ledger.is_empty() {
            flows.unallocated_reward = block_reward;
            return Ok(());
        }
        if total_qa <= 0.0 && block_reward > 0.0 {
            return Err(SimulationError::DegenerateState {
                tick,
                stage: Stage::RewardScheduling,
                quantity: "total power_qa",
            });
        }

        let locked_fraction = 1.0 - params.immediate_release_fraction;
        for (id, sector) in ledger.live_mut() {
            if let Some(day) = sector.reward_schedule.first_day().filter(|d| *d <= prev_day) {
                return Err(SimulationError::StaleScheduleEntry {
                    tick,
                    stage: Stage::RewardScheduling,
                    cohort: id,
                    day,
                });
            }
            flows.schedule_released += sector.reward_schedule.prune(days_passed);

            if block_reward > 0.0 {
                let sector_reward = block_reward * sector.power_qa / total_qa;
                flows.immediate_release += sector_reward * params.immediate_release_fraction;
                flows.reward_locked += sector.reward_schedule.merge_linear(
                    days_passed,
                    params.linear_duration,
                    sector_reward * locked_fraction,
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseSchedule;
    use crate::state::InitialConditions;

    fn genesis_cohort() -> AggregateSector {
        AggregateSector {
            origin: CohortOrigin::Genesis,
            ..AggregateSector::onboarded(1000.0, 1500.0, 400, 1.0e6, 4.0e6)
        }
    }

    fn setup(phase: BehavioralPhase) -> (SimulationEngine, SimulationState) {
        let params =
            SimulationParameters::with_phases(PhaseSchedule::constant(1000, phase).unwrap());
        let initial = InitialConditions {
            minted: 1.0e8,
            vested: 2.0e8,
            burned: 0.0,
            cohorts: vec![genesis_cohort()],
        };
        let state = SimulationState::genesis(&params, initial);
        (SimulationEngine::new(params).unwrap(), state)
    }

    #[test]
    fn test_step_advances_time() {
        let (engine, genesis) = setup(BehavioralPhase::default());
        let next = engine.step(&genesis).unwrap();

        assert_eq!(next.tick, 1);
        assert_eq!(next.days_passed, 1);
        assert!(next.phase.is_some());
        assert!(next.reward.block_reward() > 0.0);
        // genesis state is untouched
        assert_eq!(genesis.ledger.live_count(), 1);
        assert_eq!(genesis.ledger.get(crate::cohort::CohortId(0)).unwrap().power_rb, 1000.0);
    }

    #[test]
    fn test_pricing_uses_previous_network() {
        let (engine, genesis) = setup(BehavioralPhase::default());
        let next = engine.step(&genesis).unwrap();

        // onboarding and renewal happened, but the tick's power is the pre-tick sum
        assert_eq!(next.network.power_rb, 1000.0);
        assert_eq!(next.network.power_qa, 1500.0);
        assert_eq!(next.ledger.live_count(), 3);

        let base = next.network.baseline.max(1500.0);
        let expected =
            engine.params().target_locked_supply * genesis.distribution.circulating / base;
        assert!((next.pledge_rates.consensus_pledge_per_qa_power - expected).abs() < 1e-9);

        let expected_storage = 20.0 * next.reward.block_reward() / 1500.0;
        assert!((next.pledge_rates.storage_pledge_per_qa_power - expected_storage).abs() < 1e-9);
    }

    #[test]
    fn test_onboarded_cohort_pricing() {
        let phase = BehavioralPhase {
            onboarding_rate: 4.0,
            quality_factor: 2.5,
            renewal_rate: 0.0,
            ..BehavioralPhase::default()
        };
        let (engine, genesis) = setup(phase);
        let next = engine.step(&genesis).unwrap();

        let (_, cohort) = next.ledger.live().nth(1).unwrap();
        assert_eq!(cohort.origin, CohortOrigin::Onboarded);
        assert_eq!(cohort.power_rb, 4.0);
        assert_eq!(cohort.power_qa, 10.0);
        let (storage, consensus) = next.pledge_rates.pledge_for(10.0);
        assert!((cohort.storage_pledge - storage).abs() < 1e-9);
        assert!((cohort.consensus_pledge - consensus).abs() < 1e-9);
        assert!((next.flows.pledge_locked - storage - consensus).abs() < 1e-9);
    }

    #[test]
    fn test_renewal_keeps_legacy_pledge_when_higher() {
        let phase = BehavioralPhase {
            onboarding_rate: 0.0,
            renewal_rate: 0.1,
            ..BehavioralPhase::default()
        };
        let (mut engine, genesis) = setup(phase);
        engine.params.target_locked_supply = 0.0;

        let next = engine.step(&genesis).unwrap();
        let (_, renewed) = next.ledger.live().nth(1).unwrap();

        assert_eq!(renewed.origin, CohortOrigin::Renewed);
        assert!((renewed.power_rb - 100.0).abs() < 1e-9);
        // repriced storage pledge is below the legacy 10% of 5e6, which is kept
        assert!((renewed.collateral() - 5.0e5).abs() < 1e-6);
        assert!((renewed.storage_pledge - 1.0e5).abs() < 1e-6);
        assert_eq!(next.flows.pledge_locked, 0.0);
    }

    #[test]
    fn test_empty_network_cannot_price_onboarding() {
        let params = SimulationParameters::with_phases(
            PhaseSchedule::constant(10, BehavioralPhase::default()).unwrap(),
        );
        let genesis = SimulationState::genesis(&params, InitialConditions::default());
        let engine = SimulationEngine::new(params).unwrap();

        let err = engine.step(&genesis).unwrap_err();
        assert_eq!(
            err,
            SimulationError::DegenerateState {
                tick: 1,
                stage: Stage::Pricing,
                quantity: "power_qa",
            }
        );
    }

    #[test]
    fn test_idle_empty_network_mints_into_circulation() {
        let params = SimulationParameters::with_phases(
            PhaseSchedule::constant(10, BehavioralPhase::idle()).unwrap(),
        );
        let genesis = SimulationState::genesis(&params, InitialConditions::default());
        let engine = SimulationEngine::new(params).unwrap();

        let next = engine.step(&genesis).unwrap();
        assert!(next.flows.unallocated_reward > 0.0);
        assert!((next.distribution.circulating - next.distribution.minted).abs() < 1e-9);
    }

    #[test]
    fn test_unreleased_schedule_entry_is_stale() {
        let (engine, genesis) = setup(BehavioralPhase::default());
        let mut state = genesis;
        state.days_passed = 5;
        let (id, cohort) = state.ledger.live_mut().next().unwrap();
        cohort.reward_schedule.add(3, 10.0);

        let err = engine.step(&state).unwrap_err();
        assert_eq!(
            err,
            SimulationError::StaleScheduleEntry {
                tick: 1,
                stage: Stage::RewardScheduling,
                cohort: id,
                day: 3,
            }
        );
    }

    #[test]
    fn test_entries_due_this_tick_are_released() {
        let (engine, genesis) = setup(BehavioralPhase::idle());
        let mut state = genesis;
        let (_, cohort) = state.ledger.live_mut().next().unwrap();
        cohort.reward_schedule.add(1, 10.0);
        cohort.reward_schedule.add(2, 5.0);
        state.distribution = crate::distribution::TokenDistribution::genesis(
            state.distribution.minted,
            state.distribution.vested,
            state.distribution.burned,
            &state.ledger,
        );

        let next = engine.step(&state).unwrap();
        assert_eq!(next.flows.schedule_released, 10.0);
    }

    #[test]
    fn test_schedule_exhausted_mid_run() {
        let (engine, genesis) = setup(BehavioralPhase::default());
        let mut state = genesis;
        state.days_passed = 1000;
        assert_eq!(
            engine.step(&state).unwrap_err(),
            SimulationError::PhaseScheduleExhausted { day: 1001 }
        );
    }
}
