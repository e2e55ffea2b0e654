//! Preset scenarios derived from one base configuration

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Variations compared against each other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// The configuration as given
    Reference,
    /// Collateral limited to the storage pledge
    NoConsensusPledge,
    /// Baseline minting driven by the baseline alone, ignoring network power
    BaselineDeactivated,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Reference,
        Scenario::NoConsensusPledge,
        Scenario::BaselineDeactivated,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::NoConsensusPledge => "no-consensus-pledge",
            Self::BaselineDeactivated => "baseline-deactivated",
        }
    }

    /// Copy of `base` with this scenario's overrides
    pub fn configure(&self, base: &SimulationConfig) -> SimulationConfig {
        let mut config = base.clone();
        match self {
            Self::Reference => {}
            Self::NoConsensusPledge => config.economics.target_locked_supply = 0.0,
            Self::BaselineDeactivated => config.run.baseline_activated = false,
        }
        config
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| SimulationError::invalid("scenario", format!("unknown scenario `{s}`")))
    }
}
