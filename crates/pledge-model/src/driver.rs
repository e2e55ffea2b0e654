//! # Run Driver
//!
//! The only entry point external collaborators need: iterate the engine from
//! an initial state and collect one [`Snapshot`] per tick, the initial state
//! included.

use crate::engine::SimulationEngine;
use crate::error::Result;
use crate::params::SimulationParameters;
use crate::state::{SimulationState, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Output of a completed run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// `num_ticks + 1` rows, starting with the initial state
    pub snapshots: Vec<Snapshot>,
    /// Full state after the last tick
    #[serde(skip)]
    pub final_state: Option<SimulationState>,
}

impl RunOutput {
    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Runs `num_ticks` ticks of the simulation.
///
/// Parameters are validated, including phase coverage of the whole run,
/// before tick zero. Any error aborts the run.
pub fn run(
    initial_state: SimulationState,
    params: &SimulationParameters,
    num_ticks: u64,
) -> Result<RunOutput> {
    params.validate_run(initial_state.days_passed, num_ticks)?;
    let engine = SimulationEngine::new(params.clone())?;

    let span = tracing::info_span!(
        "simulation_run",
        ticks = num_ticks,
        delta_days = params.delta_days,
        target_locked_supply = params.target_locked_supply
    );
    let _guard = span.enter();
    info!(cohorts = initial_state.ledger.live_count(), "starting simulation run");

    let capacity = usize::try_from(num_ticks).map_or(0, |n| n.saturating_add(1));
    let mut snapshots = Vec::with_capacity(capacity);
    snapshots.push(initial_state.snapshot());

    let mut ticks = Ticks::new(engine, initial_state, num_ticks);
    for snapshot in ticks.by_ref() {
        snapshots.push(snapshot?);
    }

    if let Some(last) = snapshots.last() {
        info!(
            tick = last.tick,
            day = last.days_passed,
            minted = last.distribution.minted,
            circulating = last.distribution.circulating,
            locked = last.distribution.locked,
            "simulation run complete"
        );
    }

    Ok(RunOutput {
        snapshots,
        final_state: Some(ticks.into_state()),
    })
}

/// Tick-by-tick iterator over a run. Dropping it is the cancellation path.
///
/// Yields one snapshot per executed tick (not the initial state) and stops
/// after the first error.
pub struct Ticks {
    engine: SimulationEngine,
    state: SimulationState,
    remaining: u64,
    failed: bool,
}

impl Ticks {
    pub fn new(engine: SimulationEngine, initial_state: SimulationState, num_ticks: u64) -> Self {
        Self {
            engine,
            state: initial_state,
            remaining: num_ticks,
            failed: false,
        }
    }

    /// State after the last successful tick
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }
}

impl Iterator for Ticks {
    type Item = Result<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.failed {
            return None;
        }
        self.remaining -= 1;
        match self.engine.step(&self.state) {
            Ok(next) => {
                let snapshot = next.snapshot();
                self.state = next;
                Some(Ok(snapshot))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}
