use serde::Serialize;

use crate::monte_carlo::SimulationOutcome;

/// Win counts over a set of simulated elections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub harris_wins: usize,
    pub trump_wins: usize,
    /// Simulations in which nobody won outright
    pub ties: usize,
    pub total: usize,
}

impl ResultSummary {
    pub fn harris_probability(&self) -> f64 {
        self.share(self.harris_wins)
    }

    pub fn trump_probability(&self) -> f64 {
        self.share(self.trump_wins)
    }

    pub fn tie_probability(&self) -> f64 {
        self.share(self.ties)
    }

    fn share(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryAccumulator {
    threshold: u32,
    harris_wins: usize,
    trump_wins: usize,
    ties: usize,
}

impl SummaryAccumulator {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            harris_wins: 0,
            trump_wins: 0,
            ties: 0,
        }
    }

    /// A candidate wins by reaching the threshold. Harris is checked first, so
    /// an outcome where both reach it counts for Harris.
    pub fn observe(&mut self, outcome: &SimulationOutcome) {
        if outcome.harris_ev >= self.threshold {
            self.harris_wins += 1;
        } else if outcome.trump_ev >= self.threshold {
            self.trump_wins += 1;
        } else {
            self.ties += 1;
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.threshold, other.threshold);
        self.harris_wins += other.harris_wins;
        self.trump_wins += other.trump_wins;
        self.ties += other.ties;
        self
    }

    pub fn finalize(&self) -> ResultSummary {
        ResultSummary {
            harris_wins: self.harris_wins,
            trump_wins: self.trump_wins,
            ties: self.ties,
            total: self.harris_wins + self.trump_wins + self.ties,
        }
    }
}

pub fn aggregate(outcomes: &[SimulationOutcome], threshold: u32) -> ResultSummary {
    let mut acc = SummaryAccumulator::new(threshold);
    for outcome in outcomes {
        acc.observe(outcome);
    }
    acc.finalize()
}

#[cfg(test)]
mod tests {
    use super::{aggregate, ResultSummary, SummaryAccumulator};
    use crate::monte_carlo::SimulationOutcome;

    fn outcome(harris_ev: u32, trump_ev: u32) -> SimulationOutcome {
        SimulationOutcome {
            harris_ev,
            trump_ev,
        }
    }

    #[test]
    fn counts_sum_to_total() {
        let outcomes = [
            outcome(270, 268),
            outcome(300, 238),
            outcome(269, 269),
            outcome(200, 338),
            outcome(260, 260),
        ];
        let summary = aggregate(&outcomes, 270);
        assert_eq!(
            summary,
            ResultSummary {
                harris_wins: 2,
                trump_wins: 1,
                ties: 2,
                total: 5,
            }
        );
        assert_eq!(
            summary.harris_wins + summary.trump_wins + summary.ties,
            outcomes.len()
        );
    }

    #[test]
    fn split_below_custom_threshold_is_tie() {
        let outcomes = vec![outcome(10, 10); 100];
        let summary = aggregate(&outcomes, 11);
        assert_eq!(summary.ties, 100);
        assert_eq!(summary.harris_wins + summary.trump_wins, 0);
    }

    #[test]
    fn harris_is_checked_first_when_both_reach_threshold() {
        let summary = aggregate(&[outcome(10, 10), outcome(8, 12)], 5);
        assert_eq!(summary.harris_wins, 2);
        assert_eq!(summary.trump_wins, 0);
        assert_eq!(summary.ties, 0);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn trump_wins_only_when_harris_misses_threshold() {
        let summary = aggregate(&[outcome(4, 12), outcome(12, 4), outcome(4, 4)], 5);
        assert_eq!(summary.harris_wins, 1);
        assert_eq!(summary.trump_wins, 1);
        assert_eq!(summary.ties, 1);
    }

    #[test]
    fn merge_adds_partials() {
        let mut a = SummaryAccumulator::new(270);
        a.observe(&outcome(300, 238));
        let mut b = SummaryAccumulator::new(270);
        b.observe(&outcome(238, 300));
        b.observe(&outcome(269, 269));
        let merged = a.merge(b).finalize();
        assert_eq!((merged.harris_wins, merged.trump_wins, merged.ties), (1, 1, 1));
        assert_eq!(merged.total, 3);
    }

    #[test]
    fn probabilities_follow_counts() {
        let summary = ResultSummary {
            harris_wins: 3,
            trump_wins: 1,
            ties: 0,
            total: 4,
        };
        assert!((summary.harris_probability() - 0.75).abs() < 1e-12);
        assert!((summary.trump_probability() - 0.25).abs() < 1e-12);
        assert_eq!(ResultSummary::default().tie_probability(), 0.0);
    }
}
