use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ForecastError;

pub const DEFAULT_SIMULATIONS: usize = 1000;
pub const DEFAULT_EV_THRESHOLD: u32 = 270;

/// Who takes a state whose simulated margin is exactly zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroMarginPolicy {
    /// Neither candidate receives the state's electoral votes.
    #[default]
    Abstain,
    Harris,
    Trump,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of simulated elections
    pub simulation_count: usize,
    /// Electoral votes needed to win outright
    pub ev_threshold: u32,
    /// Mean margin magnitude for safe states [points]
    pub safe_margin: f64,
    /// Standard deviation for safe states [points]
    pub safe_std_dev: f64,
    /// Mean margin for a competitive state without polls [points]
    pub default_competitive_margin: f64,
    /// Standard deviation used when polls are missing or degenerate [points]
    pub default_competitive_std_dev: f64,
    /// Smallest poll-derived standard deviation accepted [points]
    pub std_dev_floor: f64,
    /// Converts a 95% margin of error into one sigma
    pub moe_confidence_divisor: f64,
    /// Multiplier on every state's standard deviation at sampling time
    pub poll_uncertainty: f64,
    pub zero_margin_policy: ZeroMarginPolicy,
    /// Fixed seed for reproducible runs; drawn from entropy when absent
    pub rng_seed: Option<u64>,
    /// Split simulations across the rayon pool
    pub parallel: bool,
    /// Simulations per independent RNG stream
    pub chunk_size: usize,
    /// Keep per-state win counts; when off the run folds straight into the summary
    pub state_tallies: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            simulation_count: DEFAULT_SIMULATIONS,
            ev_threshold: DEFAULT_EV_THRESHOLD,
            safe_margin: 25.0,
            safe_std_dev: 5.0,
            default_competitive_margin: 0.0,
            default_competitive_std_dev: 5.0,
            std_dev_floor: 1.0,
            moe_confidence_divisor: 1.96,
            poll_uncertainty: 1.0,
            zero_margin_policy: ZeroMarginPolicy::Abstain,
            rng_seed: None,
            parallel: true,
            chunk_size: 256,
            state_tallies: true,
        }
    }
}

impl ForecastConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ForecastError> {
        let raw = fs::read_to_string(path)?;
        let config: ForecastConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that does not depend on the loaded data.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.simulation_count == 0 {
            return Err(ForecastError::InvalidConfig(
                "simulation_count must be greater than zero".to_string(),
            ));
        }

        if self.ev_threshold == 0 {
            return Err(ForecastError::InvalidConfig(
                "ev_threshold must be at least 1".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(ForecastError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if !self.safe_margin.is_finite() || !self.default_competitive_margin.is_finite() {
            return Err(ForecastError::InvalidConfig(
                "safe_margin and default_competitive_margin must be finite".to_string(),
            ));
        }

        if self.safe_margin < 0.0 {
            return Err(ForecastError::InvalidConfig("safe_margin must be >= 0".to_string()));
        }

        for (label, value) in [
            ("safe_std_dev", self.safe_std_dev),
            ("default_competitive_std_dev", self.default_competitive_std_dev),
            ("moe_confidence_divisor", self.moe_confidence_divisor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ForecastError::InvalidConfig(format!(
                    "{label} must be finite and > 0"
                )));
            }
        }

        if !(self.std_dev_floor.is_finite() && self.std_dev_floor >= 0.0) {
            return Err(ForecastError::InvalidConfig(
                "std_dev_floor must be finite and >= 0".to_string(),
            ));
        }

        if !(self.poll_uncertainty.is_finite() && self.poll_uncertainty >= 0.0) {
            return Err(ForecastError::InvalidConfig(
                "poll_uncertainty must be finite and >= 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Checks the threshold against the electoral votes actually in play.
    pub fn validate_threshold(&self, total_electoral_votes: u32) -> Result<(), ForecastError> {
        if self.ev_threshold == 0 || self.ev_threshold > total_electoral_votes {
            return Err(ForecastError::InvalidConfig(format!(
                "ev_threshold {} must lie in [1, {total_electoral_votes}]",
                self.ev_threshold
            )));
        }
        Ok(())
    }
}
