//! # Issuance Mechanisms
//!
//! Two independent minting curves whose per-tick increments sum to the block
//! reward.
//!
//! ```text
//! Simple minting   S(t) = M_s · (1 − e^(−λ·t))          t = real years
//! Baseline minting B(θ) = M_b · (1 − e^(−λ·θ))          θ = effective network time
//!
//! Baseline function        b(t) = b₀ · e^(g·t)
//! Effective network time   θ(R̄) = ln(1 + g·R̄ / b₀) / g   R̄ = cumulative capped power
//! ```
//!
//! `λ = ln 2 / half_life` in both cases. θ(R̄) is the inverse of the baseline
//! integral `∫₀^θ b(τ) dτ`, so a network that always sits on the baseline
//! advances θ at the speed of real time.

use crate::constants::*;
use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Cumulative issuance as a function of a time coordinate (in years)
pub trait Issuance {
    /// Tokens issued from t = 0 up to `t`. Non-decreasing, zero at zero.
    fn issuance(&self, t: f64) -> f64;

    /// Tokens issued between two time coordinates
    fn issued_between(&self, t_start: f64, t_end: f64) -> f64 {
        self.issuance(t_end) - self.issuance(t_start)
    }
}

fn decay_rate(half_life_years: f64) -> f64 {
    LN_2 / half_life_years
}

fn validate_curve(total_supply: f64, half_life_years: f64) -> Result<()> {
    if !(total_supply.is_finite() && total_supply >= 0.0) {
        return Err(SimulationError::invalid(
            "total_supply",
            format!("must be finite and non-negative, got {total_supply}"),
        ));
    }
    if !(half_life_years.is_finite() && half_life_years > 0.0) {
        return Err(SimulationError::invalid(
            "half_life_years",
            format!("must be positive, got {half_life_years}"),
        ));
    }
    Ok(())
}

/// Exponential-decay minting driven by real elapsed time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleMinting {
    /// Asymptotic total issued by this mechanism
    pub total_supply: f64,
    pub half_life_years: f64,
}

impl Default for SimpleMinting {
    fn default() -> Self {
        Self {
            total_supply: SIMPLE_MINTING_SUPPLY,
            half_life_years: MINTING_HALF_LIFE_YEARS,
        }
    }
}

impl SimpleMinting {
    pub fn new(total_supply: f64, half_life_years: f64) -> Result<Self> {
        validate_curve(total_supply, half_life_years)?;
        Ok(Self {
            total_supply,
            half_life_years,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_curve(self.total_supply, self.half_life_years)
    }
}

impl Issuance for SimpleMinting {
    fn issuance(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        // -expm1(-x) == 1 - e^(-x), accurate for the small x of early ticks
        self.total_supply * -(-decay_rate(self.half_life_years) * t).exp_m1()
    }
}

/// Minting that only progresses as fast as network power keeps up with the
/// baseline trajectory
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineMinting {
    /// Asymptotic total issued by this mechanism
    pub total_supply: f64,
    pub half_life_years: f64,
    /// Baseline power at t = 0 (PiB)
    pub initial_baseline: f64,
    /// Continuous growth rate `g` of the baseline, per year
    pub growth_rate: f64,
}

impl Default for BaselineMinting {
    fn default() -> Self {
        Self {
            total_supply: BASELINE_MINTING_SUPPLY,
            half_life_years: MINTING_HALF_LIFE_YEARS,
            initial_baseline: INITIAL_BASELINE_PIB,
            growth_rate: BASELINE_GROWTH_RATE,
        }
    }
}

impl BaselineMinting {
    pub fn new(
        total_supply: f64,
        half_life_years: f64,
        initial_baseline: f64,
        growth_rate: f64,
    ) -> Result<Self> {
        let mechanism = Self {
            total_supply,
            half_life_years,
            initial_baseline,
            growth_rate,
        };
        mechanism.validate()?;
        Ok(mechanism)
    }

    pub fn validate(&self) -> Result<()> {
        validate_curve(self.total_supply, self.half_life_years)?;
        if !(self.initial_baseline.is_finite() && self.initial_baseline > 0.0) {
            return Err(SimulationError::invalid(
                "initial_baseline",
                format!("must be positive, got {}", self.initial_baseline),
            ));
        }
        if !(self.growth_rate.is_finite() && self.growth_rate >= 0.0) {
            return Err(SimulationError::invalid(
                "growth_rate",
                format!("must be non-negative, got {}", self.growth_rate),
            ));
        }
        Ok(())
    }

    /// Target network power `years` after genesis
    pub fn baseline_function(&self, years: f64) -> f64 {
        self.initial_baseline * (self.growth_rate * years).exp()
    }

    /// Maps cumulative capped power (PiB·years) onto the effective time axis
    pub fn effective_network_time(&self, cumm_capped_power: f64) -> f64 {
        if cumm_capped_power <= 0.0 {
            return 0.0;
        }
        if self.growth_rate == 0.0 {
            // limit of ln(1 + g·x) / g as g -> 0
            return cumm_capped_power / self.initial_baseline;
        }
        (self.growth_rate * cumm_capped_power / self.initial_baseline).ln_1p() / self.growth_rate
    }
}

impl Issuance for BaselineMinting {
    fn issuance(&self, effective_time: f64) -> f64 {
        if effective_time <= 0.0 {
            return 0.0;
        }
        self.total_supply * -(-decay_rate(self.half_life_years) * effective_time).exp_m1()
    }
}

/// Block reward minted during one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub simple_reward: f64,
    pub baseline_reward: f64,
}

impl Reward {
    pub fn new(simple_reward: f64, baseline_reward: f64) -> Self {
        Self {
            simple_reward,
            baseline_reward,
        }
    }

    /// Total tokens minted this tick
    pub fn block_reward(&self) -> f64 {
        self.simple_reward + self.baseline_reward
    }
}
