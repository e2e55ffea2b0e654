//! # Pledge Model - Consensus Pledge Economics Simulator
//!
//! Discrete-time simulation of a proof-of-storage network's collateral
//! economics: network power, minted/locked/circulating supply and the pledge
//! required for new capacity, under a time-varying behavioural schedule.
//!
//! ## Components
//!
//! - **Issuance**: simple (decay) and baseline minting curves
//! - **Phase schedule**: onboarding, quality, lifetime and renewal per phase
//! - **Cohort ledger**: aggregate sectors with pledges and reward schedules
//! - **Token distribution**: minted, vested, burned, circulating, locked
//! - **Engine**: the ordered per-tick pipeline
//! - **Driver**: runs the engine for N ticks and collects snapshots
//!
//! ## Supply Accounting
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  available   = minted + vested − burned                      │
//! │  locked      = Σ (storage + consensus pledge)                │
//! │              + Σ pending reward-schedule entries             │
//! │  circulating = available − locked                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pledge_model::{run, SimulationConfig};
//!
//! let config = SimulationConfig::default();
//! let (params, initial) = config.build()?;
//! let output = run(initial, &params, config.run.ticks)?;
//! println!("final circulating: {}", output.last().unwrap().distribution.circulating);
//! # Ok::<(), pledge_model::SimulationError>(())
//! ```

pub mod cohort;
pub mod config;
pub mod distribution;
pub mod driver;
pub mod engine;
pub mod error;
pub mod issuance;
pub mod params;
pub mod phase;
pub mod scenario;
pub mod schedule;
pub mod state;

// Re-exports
pub use cohort::{AggregateSector, CohortId, CohortLedger, CohortOrigin};
pub use config::SimulationConfig;
pub use distribution::{TickFlows, TokenDistribution};
pub use driver::{run, RunOutput, Ticks};
pub use engine::SimulationEngine;
pub use error::{ErrorKind, Result, SimulationError, Stage};
pub use issuance::{BaselineMinting, Issuance, Reward, SimpleMinting};
pub use params::{SimulationParameters, TimeUnits};
pub use phase::{BehavioralPhase, PhaseSchedule};
pub use scenario::Scenario;
pub use schedule::RewardSchedule;
pub use state::{InitialConditions, NetworkState, PledgeRates, SimulationState, Snapshot};

/// Reference values used when a parameter is not supplied
pub mod constants {
    /// Days per year for converting ticks into mechanism time
    pub const DAYS_PER_YEAR: f64 = 365.25;

    /// Asymptotic supply of simple minting
    pub const SIMPLE_MINTING_SUPPLY: f64 = 330.0e6;

    /// Asymptotic supply of baseline minting
    pub const BASELINE_MINTING_SUPPLY: f64 = 770.0e6;

    /// Half-life of both minting curves
    pub const MINTING_HALF_LIFE_YEARS: f64 = 6.0;

    /// Baseline power at genesis: 2.5 EiB
    pub const INITIAL_BASELINE_PIB: f64 = 2560.0;

    /// Baseline doubles every year
    pub const BASELINE_GROWTH_RATE: f64 = std::f64::consts::LN_2;

    /// Target fraction of circulating supply held as consensus pledge
    pub const TARGET_LOCKED_SUPPLY: f64 = 0.3;

    /// Days over which locked rewards unlock
    pub const LINEAR_DURATION_DAYS: u64 = 180;

    /// Fraction of each reward paid out immediately
    pub const IMMEDIATE_RELEASE_FRACTION: f64 = 0.25;

    /// Storage pledge covers this many days of expected reward
    pub const STORAGE_PLEDGE_DAYS: f64 = 20.0;

    /// Relative tolerance for supply conservation checks
    pub const CONSERVATION_TOLERANCE: f64 = 1e-6;
}

pub use constants::*;
