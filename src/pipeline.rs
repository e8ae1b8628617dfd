use serde::Serialize;

use crate::aggregate::{aggregate, ResultSummary};
use crate::config::ForecastConfig;
use crate::distribution::{build_distributions, DistributionReport};
use crate::loader::ElectionDataSource;
use crate::model::ElectionData;
use crate::monte_carlo::{SimulationEngine, StateTally};
use crate::ForecastError;

/// Electoral votes in a full US college.
pub const US_TOTAL_ELECTORAL_VOTES: u32 = 538;

#[derive(Debug, Clone, Serialize)]
pub struct ForecastRun {
    /// Seed actually used, whether configured or drawn
    pub seed: u64,
    pub summary: ResultSummary,
    pub distributions: DistributionReport,
    /// Empty when the run was configured without per-state tallies
    pub state_tallies: Vec<StateTally>,
}

/// Builds distributions, simulates and aggregates. Inputs are only borrowed.
///
/// With `state_tallies` off the engine's `summarize` path is used and no
/// outcomes are kept.
pub fn run_forecast<E: SimulationEngine>(
    data: &ElectionData,
    config: &ForecastConfig,
    engine: &E,
) -> Result<ForecastRun, ForecastError> {
    config.validate()?;
    let distributions = build_distributions(data, config)?;

    let total_ev = distributions.total_electoral_votes()?;
    config.validate_threshold(total_ev)?;
    if total_ev != US_TOTAL_ELECTORAL_VOTES {
        tracing::warn!(
            total_ev,
            expected = US_TOTAL_ELECTORAL_VOTES,
            "electoral votes do not add up to a full college"
        );
    }

    let seed = config.rng_seed.unwrap_or_else(rand::random);
    tracing::info!(
        seed,
        simulations = config.simulation_count,
        states = distributions.distributions.len(),
        fallbacks = distributions.fallbacks.len(),
        "starting simulation"
    );

    let (summary, state_tallies) = if config.state_tallies {
        let batch = engine.simulate(&distributions.distributions, config, seed)?;
        (aggregate(&batch.outcomes, config.ev_threshold), batch.state_tallies)
    } else {
        let summary = engine.summarize(&distributions.distributions, config, seed)?;
        (summary, Vec::new())
    };

    tracing::info!(
        harris_wins = summary.harris_wins,
        trump_wins = summary.trump_wins,
        ties = summary.ties,
        "simulation finished"
    );

    Ok(ForecastRun {
        seed,
        summary,
        distributions,
        state_tallies,
    })
}

pub fn run_forecast_from<S, E>(
    source: &S,
    config: &ForecastConfig,
    engine: &E,
) -> Result<ForecastRun, ForecastError>
where
    S: ElectionDataSource,
    E: SimulationEngine,
{
    let data = source.load()?;
    run_forecast(&data, config, engine)
}
