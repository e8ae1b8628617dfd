//! Electoral Forecast
//!
//! Monte Carlo forecast of a two-candidate US presidential race. State
//! metadata, safe-state lists and competitive-state polls are reduced to one
//! normal margin distribution per state, sampled independently many times,
//! and the resulting electoral-vote tallies are counted against the majority
//! threshold.

pub mod aggregate;
pub mod config;
pub mod distribution;
pub mod loader;
pub mod model;
pub mod monte_carlo;
pub mod pipeline;

use thiserror::Error;

pub use aggregate::{aggregate, ResultSummary, SummaryAccumulator};
pub use config::{ForecastConfig, ZeroMarginPolicy};
pub use distribution::{
    build_distributions, DegenerateReason, DistributionReport, FallbackRecord, StateDistribution,
};
pub use loader::{DirectoryDataSource, ElectionDataSource, StaticDataSource};
pub use model::{
    Classification, ElectionData, MarginShift, PollRecord, StateClassification, StateRecord,
};
pub use monte_carlo::{
    MonteCarloEngine, SimulationBatch, SimulationEngine, SimulationOutcome, StateTally,
};
pub use pipeline::{run_forecast, ForecastRun};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{context} references unknown state '{name}'")]
    UnknownState { context: &'static str, name: String },
    #[error("state '{0}' is listed more than once in the state records")]
    DuplicateState(String),
    #[error("state '{0}' has no classification")]
    Unclassified(String),
    #[error("state '{name}' is classified as both {first} and {second}")]
    ConflictingClassification {
        name: String,
        first: StateClassification,
        second: StateClassification,
    },
    #[error("invalid record for '{name}': {reason}")]
    InvalidRecord { name: String, reason: String },
    #[error("cannot build margin distribution for '{name}': {source}")]
    Distribution {
        name: String,
        #[source]
        source: rand_distr::NormalError,
    },
}

impl ForecastError {
    /// True for the fatal data-integrity class of errors.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownState { .. }
                | Self::DuplicateState(_)
                | Self::Unclassified(_)
                | Self::ConflictingClassification { .. }
                | Self::InvalidRecord { .. }
        )
    }
}
