//! Error types for the consensus pledge simulation

use crate::cohort::CohortId;
use std::fmt;
use thiserror::Error;

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Pipeline stage executing when an error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Time advance and phase selection
    Time,
    /// Block reward and per-unit pledge rates
    Pricing,
    Renewal,
    /// Splitting the block reward into per-cohort unlock schedules
    RewardScheduling,
    /// Token distribution update
    Distribution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Time => "time",
            Self::Pricing => "pricing",
            Self::Renewal => "renewal",
            Self::RewardScheduling => "reward-scheduling",
            Self::Distribution => "distribution",
        };
        f.write_str(name)
    }
}

/// Broad classification of a [`SimulationError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad inputs, caught before or at tick zero
    Configuration,
    /// A division by zero or similar that would poison later ticks with NaN
    Numerical,
    /// Lifecycle rules were violated; the ledger is no longer trustworthy
    Ledger,
}

/// Errors that can abort a simulation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    // === Configuration ===
    /// A parameter is out of its allowed range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// No phase threshold is at or after the given day
    #[error("Phase schedule does not cover day {day}")]
    PhaseScheduleExhausted { day: u64 },

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    // === Numerical ===
    /// A quantity used as a divisor was zero
    #[error("Degenerate state at tick {tick} ({stage}): {quantity} is zero")]
    DegenerateState {
        tick: u64,
        stage: Stage,
        quantity: &'static str,
    },

    // === Ledger ===
    /// A cohort balance went below zero
    #[error("Negative {field} ({value}) on cohort {cohort} at tick {tick} ({stage})")]
    NegativeBalance {
        tick: u64,
        stage: Stage,
        cohort: CohortId,
        field: &'static str,
        value: f64,
    },

    /// A reward schedule still holds an entry for a day already released
    #[error("Cohort {cohort} holds a stale schedule entry for day {day} at tick {tick} ({stage})")]
    StaleScheduleEntry {
        tick: u64,
        stage: Stage,
        cohort: CohortId,
        day: u64,
    },

    /// Supply accounting drifted from the recomputed invariant
    #[error("Ledger invariant violated at tick {tick} ({stage}): {detail}")]
    LedgerInvariant {
        tick: u64,
        stage: Stage,
        detail: String,
    },
}

impl SimulationError {
    /// Shorthand for [`SimulationError::InvalidParameter`]
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Stable numeric code, useful for scripting around the CLI
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidParameter { .. } => 1001,
            Self::PhaseScheduleExhausted { .. } => 1002,
            Self::Config(_) => 1003,
            Self::DegenerateState { .. } => 2001,
            Self::NegativeBalance { .. } => 3001,
            Self::StaleScheduleEntry { .. } => 3002,
            Self::LedgerInvariant { .. } => 3003,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. }
            | Self::PhaseScheduleExhausted { .. }
            | Self::Config(_) => ErrorKind::Configuration,
            Self::DegenerateState { .. } => ErrorKind::Numerical,
            Self::NegativeBalance { .. }
            | Self::StaleScheduleEntry { .. }
            | Self::LedgerInvariant { .. } => ErrorKind::Ledger,
        }
    }

    /// Tick index at which the run aborted, if the error was raised mid-run
    pub fn tick(&self) -> Option<u64> {
        match self {
            Self::DegenerateState { tick, .. }
            | Self::NegativeBalance { tick, .. }
            | Self::StaleScheduleEntry { tick, .. }
            | Self::LedgerInvariant { tick, .. } => Some(*tick),
            _ => None,
        }
    }
}
