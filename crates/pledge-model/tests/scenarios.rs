//! End-to-end runs of the tick pipeline against hand-checkable scenarios

use pledge_model::{
    run, AggregateSector, BehavioralPhase, CohortOrigin, InitialConditions, PhaseSchedule,
    Scenario, SimulationConfig, SimulationEngine, SimulationError, SimulationParameters,
    SimulationState, Stage, Ticks,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("pledge_model=debug")
        .try_init();
}

fn idle_params(until_day: u64) -> SimulationParameters {
    SimulationParameters::with_phases(
        PhaseSchedule::constant(until_day, BehavioralPhase::idle()).unwrap(),
    )
}

fn genesis(params: &SimulationParameters, cohorts: Vec<AggregateSector>) -> SimulationState {
    SimulationState::genesis(
        params,
        InitialConditions {
            minted: 1.0e6,
            vested: 0.0,
            burned: 0.0,
            cohorts,
        },
    )
}

#[test]
fn test_single_cohort_expires_after_lifetime() {
    init_tracing();
    let params = idle_params(400);
    let cohort = AggregateSector::onboarded(100.0, 200.0, 360, 1_000.0, 3_000.0);
    let output = run(genesis(&params, vec![cohort]), &params, 360).unwrap();

    let before = &output.snapshots[359];
    let after = &output.snapshots[360];

    assert_eq!(before.live_cohorts, 1);
    assert!(before.distribution.locked_collateral >= 4_000.0 - 1e-9);

    assert_eq!(after.days_passed, 360);
    assert_eq!(after.live_cohorts, 0);
    assert_eq!(after.expired_cohorts, 1);
    assert_eq!(after.distribution.locked, 0.0);

    // everything the cohort held is released in the tick it expires
    assert!((after.flows.expiry_released - before.distribution.locked).abs() < 1e-6);
    let delta = after.distribution.circulating - before.distribution.circulating;
    assert!((delta - after.flows.circulating_delta()).abs() < 1e-6);
    assert!((after.distribution.circulating - after.distribution.available()).abs() < 1e-6);

    let final_state = output.final_state.unwrap();
    assert!(final_state.ledger.is_empty());
}

/// Days on which a cohort of `origin` is live, starting from a lifetime-5
/// genesis cohort with `first_day` active on day 1 only
fn live_days_of(origin: CohortOrigin, first_day: BehavioralPhase) -> Vec<u64> {
    let params = SimulationParameters::with_phases(
        PhaseSchedule::new([(1, first_day), (20, BehavioralPhase::idle())]).unwrap(),
    );
    let cohort = AggregateSector {
        origin: CohortOrigin::Genesis,
        ..AggregateSector::onboarded(100.0, 100.0, 5, 10.0, 10.0)
    };
    let engine = SimulationEngine::new(params.clone()).unwrap();
    let mut ticks = Ticks::new(engine, genesis(&params, vec![cohort]), 10);

    let mut days = Vec::new();
    while let Some(snapshot) = ticks.next() {
        let snapshot = snapshot.unwrap();
        if ticks.state().ledger.live().any(|(_, c)| c.origin == origin) {
            days.push(snapshot.days_passed);
        }
    }
    days
}

#[test]
fn test_onboarded_cohort_lives_its_full_lifetime() {
    let onboard_once = BehavioralPhase {
        onboarding_rate: 2.0,
        sector_lifetime: 5,
        renewal_rate: 0.0,
        ..BehavioralPhase::default()
    };
    // created on day 1, removed on day 6
    assert_eq!(live_days_of(CohortOrigin::Onboarded, onboard_once), vec![1, 2, 3, 4, 5]);
    // the genesis cohort with the same lifetime is removed on day 5
    assert_eq!(live_days_of(CohortOrigin::Genesis, BehavioralPhase::idle()), vec![1, 2, 3, 4]);
}

#[test]
fn test_renewed_cohort_lives_its_full_lifetime() {
    let renew_once = BehavioralPhase {
        onboarding_rate: 0.0,
        renewal_rate: 0.1,
        renewal_lifetime: 5,
        ..BehavioralPhase::default()
    };
    assert_eq!(live_days_of(CohortOrigin::Renewed, renew_once), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_full_immediate_release_leaves_schedules_empty() {
    let mut config = SimulationConfig::default();
    config.run.ticks = 200;
    config.economics.immediate_release_fraction = 1.0;
    let (params, initial) = config.build().unwrap();

    let output = run(initial, &params, config.run.ticks).unwrap();

    for snapshot in &output.snapshots {
        assert_eq!(snapshot.distribution.locked_rewards, 0.0);
        assert_eq!(snapshot.flows.reward_locked, 0.0);
        assert!((snapshot.flows.immediate_release - snapshot.block_reward).abs() < 1e-6);
    }
    let final_state = output.final_state.unwrap();
    assert!(final_state
        .ledger
        .live()
        .all(|(_, cohort)| cohort.reward_schedule.is_empty()));
}

#[test]
fn test_zero_renewal_never_creates_renewed_cohorts() {
    let mut config = SimulationConfig::default();
    config.run.ticks = 400;
    for phase in &mut config.phases {
        phase.behaviour.renewal_rate = 0.0;
    }
    let (params, initial) = config.build().unwrap();
    let engine = SimulationEngine::new(params).unwrap();

    let mut ticks = Ticks::new(engine, initial, config.run.ticks);
    let mut previous = ticks.state().ledger.live_count();
    while let Some(snapshot) = ticks.next() {
        let snapshot = snapshot.unwrap();
        // at most the one onboarded cohort per tick
        assert!(snapshot.live_cohorts <= previous + 1);
        previous = snapshot.live_cohorts;
        assert!(ticks
            .state()
            .ledger
            .live()
            .all(|(_, cohort)| cohort.origin != CohortOrigin::Renewed));
    }
    assert_eq!(ticks.state().tick, 400);
}

#[test]
fn test_zero_rate_tick_keeps_membership() {
    let mut params = idle_params(100);
    params.delta_days = 2;
    let cohorts = vec![
        AggregateSector::onboarded(10.0, 10.0, 50, 5.0, 5.0),
        AggregateSector::onboarded(20.0, 40.0, 100, 5.0, 5.0),
        AggregateSector::onboarded(30.0, 30.0, 150, 5.0, 5.0),
    ];
    let state = genesis(&params, cohorts);
    let engine = SimulationEngine::new(params).unwrap();

    let next = engine.step(&state).unwrap();

    let before: Vec<_> = state.ledger.live().map(|(id, c)| (id, c.remaining_days)).collect();
    let after: Vec<_> = next.ledger.live().map(|(id, c)| (id, c.remaining_days)).collect();
    assert_eq!(before.len(), after.len());
    for ((id_a, days_a), (id_b, days_b)) in before.iter().zip(&after) {
        assert_eq!(id_a, id_b);
        assert_eq!(*days_b, days_a - 2);
    }
    assert_eq!(next.ledger.power_rb(), state.ledger.power_rb());
    assert_eq!(next.ledger.collateral(), state.ledger.collateral());
}

#[test]
fn test_phase_boundary_day_belongs_to_ending_phase() {
    let first = BehavioralPhase {
        onboarding_rate: 1.0,
        renewal_rate: 0.0,
        ..BehavioralPhase::default()
    };
    let second = BehavioralPhase {
        onboarding_rate: 2.0,
        ..first.clone()
    };
    let params =
        SimulationParameters::with_phases(PhaseSchedule::new([(10, first), (20, second)]).unwrap());
    let cohort = AggregateSector::onboarded(1_000.0, 1_000.0, 500, 1.0e4, 1.0e4);
    let state = genesis(&params, vec![cohort]);
    let engine = SimulationEngine::new(params).unwrap();

    let mut ticks = Ticks::new(engine, state, 20);
    for snapshot in ticks.by_ref().take(10) {
        snapshot.unwrap();
    }
    assert_eq!(ticks.state().days_passed, 10);
    assert_eq!(ticks.state().phase.as_ref().unwrap().onboarding_rate, 1.0);

    ticks.next().unwrap().unwrap();
    assert_eq!(ticks.state().days_passed, 11);
    assert_eq!(ticks.state().phase.as_ref().unwrap().onboarding_rate, 2.0);
}

#[test]
fn test_multi_day_ticks_release_every_vesting_entry() {
    let mut params = idle_params(100);
    params.delta_days = 5;
    params.vesting_schedule.insert(3, 10.0);
    params.vesting_schedule.insert(5, 20.0);
    params.vesting_schedule.insert(6, 40.0);
    params.burn_schedule.insert(4, 1.0);
    let cohort = AggregateSector::onboarded(100.0, 100.0, 500, 1.0, 1.0);

    let output = run(genesis(&params, vec![cohort]), &params, 2).unwrap();

    assert_eq!(output.snapshots[1].flows.vested, 30.0);
    assert_eq!(output.snapshots[1].flows.burned, 1.0);
    assert_eq!(output.snapshots[2].flows.vested, 40.0);
    assert_eq!(output.snapshots[2].distribution.vested, 70.0);
}

#[test]
fn test_onboarding_into_empty_network_is_degenerate() {
    let params = SimulationParameters::with_phases(
        PhaseSchedule::constant(100, BehavioralPhase::default()).unwrap(),
    );

    let err = run(genesis(&params, Vec::new()), &params, 10).unwrap_err();

    assert_eq!(
        err,
        SimulationError::DegenerateState {
            tick: 1,
            stage: Stage::Pricing,
            quantity: "power_qa",
        }
    );
    assert_eq!(err.tick(), Some(1));
}

#[test]
fn test_empty_idle_network_mints_into_circulation() {
    let params = idle_params(30);
    let output = run(genesis(&params, Vec::new()), &params, 30).unwrap();

    let last = output.last().unwrap();
    assert!(last.distribution.minted > 1.0e6);
    assert_eq!(last.distribution.locked, 0.0);
    assert!((last.distribution.circulating - last.distribution.minted).abs() < 1e-6);
}

#[test]
fn test_no_consensus_pledge_scenario_locks_less() {
    let mut base = SimulationConfig::default();
    base.run.ticks = 365;

    let mut finals = Vec::new();
    for scenario in [Scenario::Reference, Scenario::NoConsensusPledge] {
        let config = scenario.configure(&base);
        let (params, initial) = config.build().unwrap();
        let output = run(initial, &params, config.run.ticks).unwrap();
        if scenario == Scenario::NoConsensusPledge {
            assert!(output
                .snapshots
                .iter()
                .all(|s| s.consensus_pledge_per_qa_power == 0.0));
        }
        finals.push(output.last().cloned().unwrap());
    }

    let (reference, no_cp) = (&finals[0], &finals[1]);
    assert!(no_cp.distribution.locked_collateral < reference.distribution.locked_collateral);
    assert!(no_cp.distribution.circulating > reference.distribution.circulating);
}

#[test]
fn test_snapshots_serialize_to_json() {
    let params = idle_params(10);
    let cohort = AggregateSector::onboarded(100.0, 150.0, 100, 10.0, 10.0);
    let output = run(genesis(&params, vec![cohort]), &params, 3).unwrap();

    let value = serde_json::to_value(&output).unwrap();
    let snapshots = value["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots[3]["days_passed"], 3);
    assert!(snapshots[3]["distribution"]["circulating"].is_number());
    assert!(value.get("final_state").is_none());
}
