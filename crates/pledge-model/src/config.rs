//! Simulation configuration types
//!
//! A TOML document that fully describes a run. Every section is optional and
//! falls back to the reference scenario.
//!
//! ```toml
//! [run]
//! ticks = 1825
//! delta_days = 1
//!
//! [economics]
//! target_locked_supply = 0.3
//!
//! [[phases]]
//! until_day = 365
//! onboarding_rate = 15.0
//! quality_factor = 1.5
//! sector_lifetime = 540
//! renewal_rate = 0.0015
//! renewal_lifetime = 540
//! ```

use crate::cohort::{AggregateSector, CohortOrigin};
use crate::constants::*;
use crate::error::{Result, SimulationError};
use crate::issuance::{BaselineMinting, SimpleMinting};
use crate::params::{SimulationParameters, TimeUnits};
use crate::phase::{BehavioralPhase, PhaseSchedule};
use crate::schedule::RewardSchedule;
use crate::state::{InitialConditions, SimulationState};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete simulation configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Run length and time units
    #[serde(default)]
    pub run: RunConfig,

    /// Collateral and reward-vesting economics
    #[serde(default)]
    pub economics: EconomicsConfig,

    /// Minting mechanisms
    #[serde(default)]
    pub minting: MintingConfig,

    /// Behavioural phases, keyed by the last day each covers
    #[serde(default = "default_phases")]
    pub phases: Vec<PhaseConfig>,

    /// Day-keyed vesting releases
    #[serde(default)]
    pub vesting: Vec<DayAmount>,

    /// Day-keyed burns
    #[serde(default)]
    pub burns: Vec<DayAmount>,

    /// Supply and cohorts at tick zero
    #[serde(default)]
    pub genesis: GenesisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            economics: EconomicsConfig::default(),
            minting: MintingConfig::default(),
            phases: default_phases(),
            vesting: Vec::new(),
            burns: Vec::new(),
            genesis: GenesisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Run settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of ticks to simulate
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Days per tick
    #[serde(default = "default_delta_days")]
    pub delta_days: u64,

    #[serde(default = "default_days_per_year")]
    pub days_per_year: f64,

    /// Cap network power at the baseline when integrating capped power
    #[serde(default = "default_true")]
    pub baseline_activated: bool,
}

fn default_ticks() -> u64 {
    1825
}

fn default_delta_days() -> u64 {
    1
}

fn default_days_per_year() -> f64 {
    DAYS_PER_YEAR
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            delta_days: default_delta_days(),
            days_per_year: default_days_per_year(),
            baseline_activated: true,
        }
    }
}

/// Economics settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicsConfig {
    /// Fraction of circulating supply targeted for locking (0.0-1.0)
    #[serde(default = "default_target_locked_supply")]
    pub target_locked_supply: f64,

    /// Days over which locked rewards vest linearly
    #[serde(default = "default_linear_duration")]
    pub linear_duration: u64,

    /// Fraction of rewards released immediately (0.0-1.0)
    #[serde(default = "default_immediate_release_fraction")]
    pub immediate_release_fraction: f64,

    /// Days of expected reward covered by the storage pledge
    #[serde(default = "default_storage_pledge_days")]
    pub storage_pledge_days: f64,
}

fn default_target_locked_supply() -> f64 {
    TARGET_LOCKED_SUPPLY
}

fn default_linear_duration() -> u64 {
    LINEAR_DURATION_DAYS
}

fn default_immediate_release_fraction() -> f64 {
    IMMEDIATE_RELEASE_FRACTION
}

fn default_storage_pledge_days() -> f64 {
    STORAGE_PLEDGE_DAYS
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            target_locked_supply: default_target_locked_supply(),
            linear_duration: default_linear_duration(),
            immediate_release_fraction: default_immediate_release_fraction(),
            storage_pledge_days: default_storage_pledge_days(),
        }
    }
}

/// Minting mechanism settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MintingConfig {
    #[serde(default)]
    pub simple: SimpleMinting,

    #[serde(default)]
    pub baseline: BaselineMinting,
}

/// One `[[phases]]` entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Last day this phase is in force
    pub until_day: u64,

    #[serde(flatten)]
    pub behaviour: BehavioralPhase,
}

fn default_phases() -> Vec<PhaseConfig> {
    // (until_day, onboarding PiB/day, quality factor)
    [
        (365, 15.0, 1.5),
        (730, 8.0, 2.5),
        (1095, 5.0, 3.0),
        (1460, 12.0, 4.0),
        (1825, 20.0, 5.0),
    ]
    .into_iter()
    .map(|(until_day, onboarding_rate, quality_factor)| PhaseConfig {
        until_day,
        behaviour: BehavioralPhase {
            onboarding_rate,
            quality_factor,
            sector_lifetime: 540,
            renewal_rate: 0.0015,
            renewal_lifetime: 540,
        },
    })
    .collect()
}

/// A `day = .., amount = ..` entry
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayAmount {
    pub day: u64,
    pub amount: f64,
}

/// Tick-zero supply and cohorts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisConfig {
    #[serde(default)]
    pub minted: f64,

    #[serde(default)]
    pub vested: f64,

    #[serde(default)]
    pub burned: f64,

    #[serde(default)]
    pub cohorts: Vec<GenesisCohort>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            minted: 250.0e6,
            vested: 250.0e6,
            burned: 30.0e6,
            cohorts: vec![GenesisCohort::default()],
        }
    }
}

/// A cohort present at tick zero
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenesisCohort {
    pub power_rb: f64,
    pub power_qa: f64,
    pub remaining_days: u64,
    #[serde(default)]
    pub storage_pledge: f64,
    #[serde(default)]
    pub consensus_pledge: f64,
    /// Pending rewards, unlocking linearly from day 1
    #[serde(default)]
    pub locked_rewards: f64,
}

impl Default for GenesisCohort {
    fn default() -> Self {
        Self {
            power_rb: 15_000.0,
            power_qa: 16_500.0,
            remaining_days: 540,
            storage_pledge: 20.0e6,
            consensus_pledge: 110.0e6,
            locked_rewards: 0.0,
        }
    }
}

impl GenesisCohort {
    fn to_sector(&self, linear_duration: u64) -> Result<AggregateSector> {
        let values = [
            ("power_rb", self.power_rb),
            ("storage_pledge", self.storage_pledge),
            ("consensus_pledge", self.consensus_pledge),
            ("locked_rewards", self.locked_rewards),
        ];
        for (name, value) in values {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimulationError::invalid(
                    name,
                    format!("genesis cohort value must be non-negative, got {value}"),
                ));
            }
        }
        if !(self.power_qa.is_finite() && self.power_qa >= self.power_rb) {
            return Err(SimulationError::invalid(
                "power_qa",
                format!("must be at least power_rb ({}), got {}", self.power_rb, self.power_qa),
            ));
        }

        let mut reward_schedule = RewardSchedule::new();
        reward_schedule.merge_linear(1, linear_duration, self.locked_rewards);

        Ok(AggregateSector {
            power_rb: self.power_rb,
            power_qa: self.power_qa,
            remaining_days: i64::try_from(self.remaining_days).unwrap_or(i64::MAX),
            storage_pledge: self.storage_pledge,
            consensus_pledge: self.consensus_pledge,
            reward_schedule,
            origin: CohortOrigin::Genesis,
        })
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SimulationError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SimulationError::Config(e.to_string()))
    }

    /// Reads a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Builds validated run parameters
    pub fn to_parameters(&self) -> Result<SimulationParameters> {
        let phases = PhaseSchedule::new(
            self.phases
                .iter()
                .map(|p| (p.until_day, p.behaviour.clone())),
        )?;

        let mut params = SimulationParameters::with_phases(phases);
        params.target_locked_supply = self.economics.target_locked_supply;
        params.linear_duration = self.economics.linear_duration;
        params.immediate_release_fraction = self.economics.immediate_release_fraction;
        params.storage_pledge_days = self.economics.storage_pledge_days;
        params.simple_mechanism = self.minting.simple.clone();
        params.baseline_mechanism = self.minting.baseline.clone();
        params.delta_days = self.run.delta_days;
        params.baseline_activated = self.run.baseline_activated;
        params.time = TimeUnits {
            days_per_year: self.run.days_per_year,
        };
        for entry in &self.vesting {
            *params.vesting_schedule.entry(entry.day).or_insert(0.0) += entry.amount;
        }
        for entry in &self.burns {
            *params.burn_schedule.entry(entry.day).or_insert(0.0) += entry.amount;
        }

        params.validate_run(0, self.run.ticks)?;
        Ok(params)
    }

    pub fn initial_conditions(&self) -> Result<InitialConditions> {
        let cohorts = self
            .genesis
            .cohorts
            .iter()
            .map(|c| c.to_sector(self.economics.linear_duration))
            .collect::<Result<Vec<_>>>()?;

        Ok(InitialConditions {
            minted: self.genesis.minted,
            vested: self.genesis.vested,
            burned: self.genesis.burned,
            cohorts,
        })
    }

    /// Parameters plus the matching tick-zero state
    pub fn build(&self) -> Result<(SimulationParameters, SimulationState)> {
        let params = self.to_parameters()?;
        let state = SimulationState::genesis(&params, self.initial_conditions()?);
        Ok((params, state))
    }
}
