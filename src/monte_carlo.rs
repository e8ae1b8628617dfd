use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{aggregate, ResultSummary, SummaryAccumulator};
use crate::config::{ForecastConfig, ZeroMarginPolicy};
use crate::distribution::StateDistribution;
use crate::model::checked_electoral_total;
use crate::ForecastError;

/// Electoral votes won by each candidate in one simulated election.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationOutcome {
    pub harris_ev: u32,
    pub trump_ev: u32,
}

impl SimulationOutcome {
    pub fn allocated_ev(&self) -> u32 {
        self.harris_ev + self.trump_ev
    }
}

/// How often each candidate carried a single state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateTally {
    pub state_name: String,
    pub harris: usize,
    pub trump: usize,
    pub abstained: usize,
}

impl StateTally {
    pub fn runs(&self) -> usize {
        self.harris + self.trump + self.abstained
    }

    pub fn harris_share(&self) -> f64 {
        if self.runs() == 0 {
            0.0
        } else {
            self.harris as f64 / self.runs() as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationBatch {
    pub seed: u64,
    pub outcomes: Vec<SimulationOutcome>,
    pub state_tallies: Vec<StateTally>,
}

pub trait SimulationEngine {
    fn simulate(
        &self,
        distributions: &[StateDistribution],
        config: &ForecastConfig,
        seed: u64,
    ) -> Result<SimulationBatch, ForecastError>;

    /// Summary only, for runs that do not need outcomes or per-state tallies.
    fn summarize(
        &self,
        distributions: &[StateDistribution],
        config: &ForecastConfig,
        seed: u64,
    ) -> Result<ResultSummary, ForecastError> {
        let batch = self.simulate(distributions, config, seed)?;
        Ok(aggregate(&batch.outcomes, config.ev_threshold))
    }
}

/// Independent per-state normal draws, split into fixed-size chunks.
///
/// Chunk `i` always draws from stream `i` of a ChaCha8 generator keyed by the
/// run seed, so results depend only on the seed and chunk size, never on how
/// many workers ran the chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonteCarloEngine {
    pub parallel: bool,
    pub chunk_size: usize,
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self::from_config(&ForecastConfig::default())
    }
}

impl MonteCarloEngine {
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            parallel: config.parallel,
            chunk_size: config.chunk_size.max(1),
        }
    }

    fn chunks(&self, simulation_count: usize) -> Vec<(usize, usize)> {
        let size = self.chunk_size.max(1);
        (0..simulation_count.div_ceil(size))
            .map(|index| (index, size.min(simulation_count - index * size)))
            .collect()
    }
}

impl SimulationEngine for MonteCarloEngine {
    fn simulate(
        &self,
        distributions: &[StateDistribution],
        config: &ForecastConfig,
        seed: u64,
    ) -> Result<SimulationBatch, ForecastError> {
        let plan = SamplingPlan::new(distributions, config)?;
        let chunks = self.chunks(config.simulation_count);
        let run = |(index, runs): (usize, usize)| plan.collect_chunk(seed, index, runs);

        let parts: Vec<ChunkResult> = if self.parallel {
            chunks.into_par_iter().map(run).collect()
        } else {
            chunks.into_iter().map(run).collect()
        };

        let mut outcomes = Vec::with_capacity(config.simulation_count);
        let mut state_tallies: Vec<StateTally> = distributions
            .iter()
            .map(|d| StateTally {
                state_name: d.state_name.clone(),
                ..StateTally::default()
            })
            .collect();

        for part in parts {
            outcomes.extend(part.outcomes);
            for (tally, [harris, trump, abstained]) in state_tallies.iter_mut().zip(part.tallies) {
                tally.harris += harris;
                tally.trump += trump;
                tally.abstained += abstained;
            }
        }

        Ok(SimulationBatch {
            seed,
            outcomes,
            state_tallies,
        })
    }

    /// Folds every simulation straight into a summary without keeping outcomes.
    fn summarize(
        &self,
        distributions: &[StateDistribution],
        config: &ForecastConfig,
        seed: u64,
    ) -> Result<ResultSummary, ForecastError> {
        let plan = SamplingPlan::new(distributions, config)?;
        let chunks = self.chunks(config.simulation_count);
        let fold_chunk = |(index, runs): (usize, usize)| {
            let mut acc = SummaryAccumulator::new(config.ev_threshold);
            plan.run_chunk(seed, index, runs, |outcome, _| acc.observe(&outcome));
            acc
        };

        let acc = if self.parallel {
            chunks
                .into_par_iter()
                .map(fold_chunk)
                .reduce(|| SummaryAccumulator::new(config.ev_threshold), SummaryAccumulator::merge)
        } else {
            chunks
                .into_iter()
                .map(fold_chunk)
                .fold(SummaryAccumulator::new(config.ev_threshold), SummaryAccumulator::merge)
        };
        Ok(acc.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateWinner {
    Harris,
    Trump,
    Neither,
}

struct ChunkResult {
    outcomes: Vec<SimulationOutcome>,
    tallies: Vec<[usize; 3]>,
}

struct SamplingPlan {
    margins: Vec<Normal<f64>>,
    votes: Vec<u32>,
    policy: ZeroMarginPolicy,
}

impl SamplingPlan {
    fn new(
        distributions: &[StateDistribution],
        config: &ForecastConfig,
    ) -> Result<Self, ForecastError> {
        let margins = distributions
            .iter()
            .map(|d| d.normal(config.poll_uncertainty))
            .collect::<Result<Vec<_>, _>>()?;
        // Per-outcome tallies never exceed this total.
        checked_electoral_total(
            distributions
                .iter()
                .map(|d| (d.state_name.as_str(), d.electoral_votes)),
        )?;
        Ok(Self {
            margins,
            votes: distributions.iter().map(|d| d.electoral_votes).collect(),
            policy: config.zero_margin_policy,
        })
    }

    fn run_chunk<F>(&self, seed: u64, index: usize, runs: usize, mut emit: F)
    where
        F: FnMut(SimulationOutcome, &[StateWinner]),
    {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(index as u64);
        let mut winners = vec![StateWinner::Neither; self.margins.len()];

        for _ in 0..runs {
            let mut outcome = SimulationOutcome::default();
            for (state, (margin, &votes)) in self.margins.iter().zip(&self.votes).enumerate() {
                let winner = self.call_state(margin.sample(&mut rng));
                match winner {
                    StateWinner::Harris => outcome.harris_ev += votes,
                    StateWinner::Trump => outcome.trump_ev += votes,
                    StateWinner::Neither => {}
                }
                winners[state] = winner;
            }
            emit(outcome, winners.as_slice());
        }
    }

    fn collect_chunk(&self, seed: u64, index: usize, runs: usize) -> ChunkResult {
        let mut result = ChunkResult {
            outcomes: Vec::with_capacity(runs),
            tallies: vec![[0; 3]; self.margins.len()],
        };
        self.run_chunk(seed, index, runs, |outcome, winners| {
            result.outcomes.push(outcome);
            for (tally, winner) in result.tallies.iter_mut().zip(winners) {
                let slot = match winner {
                    StateWinner::Harris => 0,
                    StateWinner::Trump => 1,
                    StateWinner::Neither => 2,
                };
                tally[slot] += 1;
            }
        });
        result
    }

    fn call_state(&self, margin_draw: f64) -> StateWinner {
        if margin_draw > 0.0 {
            StateWinner::Harris
        } else if margin_draw < 0.0 {
            StateWinner::Trump
        } else {
            match self.policy {
                ZeroMarginPolicy::Abstain => StateWinner::Neither,
                ZeroMarginPolicy::Harris => StateWinner::Harris,
                ZeroMarginPolicy::Trump => StateWinner::Trump,
            }
        }
    }
}
