//! Per-state margin distributions.
//!
//! Safe states get a fixed distribution from the configuration. Competitive
//! states get the weight-averaged poll margin, with one sigma taken from the
//! weight-averaged margin of error. Competitive states with no polls, or whose
//! polls imply a spread below the floor, fall back to the configured defaults;
//! those fallbacks are logged and reported but never fail the build.

use std::collections::HashMap;

use rand_distr::Normal;
use serde::Serialize;

use crate::config::ForecastConfig;
use crate::model::{checked_electoral_total, ElectionData, PollRecord, StateClassification};
use crate::ForecastError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDistribution {
    pub state_name: String,
    pub electoral_votes: u32,
    pub classification: StateClassification,
    /// Harris minus Trump [points]
    pub mean_margin: f64,
    pub std_dev: f64,
    pub poll_count: usize,
}

impl StateDistribution {
    /// Sampling distribution with the spread scaled by `poll_uncertainty`.
    pub fn normal(&self, poll_uncertainty: f64) -> Result<Normal<f64>, ForecastError> {
        Normal::new(self.mean_margin, self.std_dev * poll_uncertainty).map_err(|source| {
            ForecastError::Distribution {
                name: self.state_name.clone(),
                source,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegenerateReason {
    NoPolls,
    BelowFloor { derived_std_dev: f64 },
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackRecord {
    pub state_name: String,
    #[serde(flatten)]
    pub reason: DegenerateReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionReport {
    pub distributions: Vec<StateDistribution>,
    pub fallbacks: Vec<FallbackRecord>,
}

impl DistributionReport {
    pub fn total_electoral_votes(&self) -> Result<u32, ForecastError> {
        checked_electoral_total(
            self.distributions
                .iter()
                .map(|d| (d.state_name.as_str(), d.electoral_votes)),
        )
    }

    pub fn get(&self, state_name: &str) -> Option<&StateDistribution> {
        self.distributions
            .iter()
            .find(|d| d.state_name == state_name)
    }
}

/// Builds exactly one distribution per state record, in record order.
pub fn build_distributions(
    data: &ElectionData,
    config: &ForecastConfig,
) -> Result<DistributionReport, ForecastError> {
    data.validate_states()?;
    let classification = data.classification.resolve(&data.states)?;

    let mut polls_by_state: HashMap<&str, Vec<&PollRecord>> = HashMap::new();
    for poll in &data.polls {
        if !classification.contains_key(&poll.state_name) {
            return Err(ForecastError::UnknownState {
                context: "poll",
                name: poll.state_name.clone(),
            });
        }
        poll.validate()?;
        polls_by_state
            .entry(poll.state_name.as_str())
            .or_default()
            .push(poll);
    }

    let mut shifts: HashMap<&str, f64> = HashMap::new();
    for shift in &data.margin_shifts {
        if !classification.contains_key(&shift.state_name) {
            return Err(ForecastError::UnknownState {
                context: "margin shift",
                name: shift.state_name.clone(),
            });
        }
        if !shift.margin_shift.is_finite() {
            return Err(ForecastError::InvalidRecord {
                name: shift.state_name.clone(),
                reason: "margin shift must be finite".to_string(),
            });
        }
        *shifts.entry(shift.state_name.as_str()).or_insert(0.0) += shift.margin_shift;
    }

    let mut report = DistributionReport {
        distributions: Vec::with_capacity(data.states.len()),
        fallbacks: Vec::new(),
    };

    for state in &data.states {
        let kind = classification[&state.name];
        let polls = polls_by_state
            .get(state.name.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let (mean_margin, std_dev) = match kind {
            StateClassification::SafeHarris => (config.safe_margin, config.safe_std_dev),
            StateClassification::SafeTrump => (-config.safe_margin, config.safe_std_dev),
            StateClassification::Competitive => {
                let (mean, std_dev, fallback) = competitive_parameters(polls, config);
                if let Some(reason) = fallback {
                    tracing::warn!(
                        state = %state.name,
                        ?reason,
                        std_dev,
                        "degenerate competitive distribution, using defaults"
                    );
                    report.fallbacks.push(FallbackRecord {
                        state_name: state.name.clone(),
                        reason,
                    });
                }
                (mean, std_dev)
            }
        };

        if kind != StateClassification::Competitive && !polls.is_empty() {
            tracing::debug!(
                state = %state.name,
                polls = polls.len(),
                "ignoring polls for safe state"
            );
        }

        let shift = shifts.get(state.name.as_str()).copied().unwrap_or(0.0);
        report.distributions.push(StateDistribution {
            state_name: state.name.clone(),
            electoral_votes: state.electoral_votes,
            classification: kind,
            mean_margin: mean_margin + shift,
            std_dev,
            poll_count: polls.len(),
        });
    }

    Ok(report)
}

/// Weighted margin and spread for one competitive state.
fn competitive_parameters(
    polls: &[&PollRecord],
    config: &ForecastConfig,
) -> (f64, f64, Option<DegenerateReason>) {
    let total_weight: f64 = polls.iter().map(|p| p.weight).sum();
    if polls.is_empty() || total_weight <= 0.0 {
        return (
            config.default_competitive_margin,
            config.default_competitive_std_dev,
            Some(DegenerateReason::NoPolls),
        );
    }

    let mean_margin = polls.iter().map(|p| p.weight * p.margin()).sum::<f64>() / total_weight;
    let weighted_moe = polls.iter().map(|p| p.weight * p.moe).sum::<f64>() / total_weight;
    let derived = weighted_moe / config.moe_confidence_divisor;

    if !derived.is_finite() {
        return (
            mean_margin,
            config.default_competitive_std_dev,
            Some(DegenerateReason::NonFinite),
        );
    }
    if derived < config.std_dev_floor || derived <= 0.0 {
        return (
            mean_margin,
            config.default_competitive_std_dev,
            Some(DegenerateReason::BelowFloor {
                derived_std_dev: derived,
            }),
        );
    }

    (mean_margin, derived, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classification, MarginShift, StateRecord};

    fn single_competitive(polls: Vec<PollRecord>) -> ElectionData {
        ElectionData {
            states: vec![StateRecord::new("Swing", 10)],
            classification: Classification {
                competitive: vec!["Swing".into()],
                ..Classification::default()
            },
            polls,
            margin_shifts: Vec::new(),
        }
    }

    #[test]
    fn competitive_without_polls_uses_defaults() {
        let config = ForecastConfig::default();
        let report = build_distributions(&single_competitive(Vec::new()), &config).unwrap();
        let d = report.get("Swing").unwrap();
        assert_eq!(d.mean_margin, config.default_competitive_margin);
        assert_eq!(d.std_dev, config.default_competitive_std_dev);
        assert_eq!(report.fallbacks.len(), 1);
        assert_eq!(report.fallbacks[0].reason, DegenerateReason::NoPolls);
    }

    #[test]
    fn single_poll_sets_margin_and_spread() {
        let data = single_competitive(vec![PollRecord::new("Swing", 52.0, 45.0, 5.0, 3.0)]);
        let report = build_distributions(&data, &ForecastConfig::default()).unwrap();
        let d = report.get("Swing").unwrap();
        assert!((d.mean_margin - 7.0).abs() < 1e-12);
        assert!((d.std_dev - 3.0 / 1.96).abs() < 1e-12);
        assert!((d.std_dev - 1.53).abs() < 0.01);
        assert!(report.fallbacks.is_empty());
    }

    #[test]
    fn polls_are_weight_averaged() {
        let data = single_competitive(vec![
            PollRecord::new("Swing", 55.0, 45.0, 2.0, 3.0),
            PollRecord::new("Swing", 50.0, 50.0, 1.0, 4.0),
        ]);
        let report = build_distributions(&data, &ForecastConfig::default()).unwrap();
        let d = report.get("Swing").unwrap();
        assert!((d.mean_margin - 20.0 / 3.0).abs() < 1e-12);
        assert!((d.std_dev - (10.0 / 3.0) / 1.96).abs() < 1e-12);
        assert_eq!(d.poll_count, 2);
    }

    #[test]
    fn tight_polls_fall_back_to_default_spread() {
        let data = single_competitive(vec![PollRecord::new("Swing", 49.0, 48.0, 5.0, 1.0)]);
        let config = ForecastConfig::default();
        let report = build_distributions(&data, &config).unwrap();
        let d = report.get("Swing").unwrap();
        assert!((d.mean_margin - 1.0).abs() < 1e-12);
        assert_eq!(d.std_dev, config.default_competitive_std_dev);
        assert!(matches!(
            report.fallbacks[0].reason,
            DegenerateReason::BelowFloor { derived_std_dev } if derived_std_dev < 1.0
        ));
    }

    #[test]
    fn overflowing_spread_falls_back_as_non_finite() {
        let data = single_competitive(vec![PollRecord::new("Swing", 52.0, 45.0, 5.0, 3.0)]);
        let config = ForecastConfig {
            moe_confidence_divisor: 1e-320,
            ..ForecastConfig::default()
        };
        let report = build_distributions(&data, &config).unwrap();
        let d = report.get("Swing").unwrap();
        assert!((d.mean_margin - 7.0).abs() < 1e-12);
        assert_eq!(d.std_dev, config.default_competitive_std_dev);
        assert_eq!(report.fallbacks.len(), 1);
        assert_eq!(report.fallbacks[0].reason, DegenerateReason::NonFinite);
    }

    #[test]
    fn safe_states_ignore_polls() {
        let data = ElectionData {
            states: vec![StateRecord::new("Blue", 20), StateRecord::new("Red", 12)],
            classification: Classification {
                safe_harris: vec!["Blue".into()],
                safe_trump: vec!["Red".into()],
                competitive: Vec::new(),
            },
            polls: vec![PollRecord::new("Red", 60.0, 30.0, 10.0, 2.0)],
            margin_shifts: Vec::new(),
        };
        let config = ForecastConfig::default();
        let report = build_distributions(&data, &config).unwrap();
        assert_eq!(report.distributions[0].mean_margin, 25.0);
        assert_eq!(report.distributions[1].mean_margin, -25.0);
        assert_eq!(report.distributions[1].std_dev, config.safe_std_dev);
        assert!(report.fallbacks.is_empty());
    }

    #[test]
    fn poll_for_unknown_state_fails_build() {
        let data = single_competitive(vec![PollRecord::new("Nowhere", 50.0, 45.0, 5.0, 3.0)]);
        let err = build_distributions(&data, &ForecastConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::UnknownState { context: "poll", .. }));
    }

    #[test]
    fn margin_shift_moves_mean() {
        let mut data = single_competitive(vec![PollRecord::new("Swing", 48.0, 50.0, 5.0, 3.0)]);
        data.margin_shifts.push(MarginShift {
            state_name: "Swing".into(),
            margin_shift: 5.0,
        });
        let report = build_distributions(&data, &ForecastConfig::default()).unwrap();
        assert!((report.get("Swing").unwrap().mean_margin - 3.0).abs() < 1e-12);
    }

    #[test]
    fn margin_shift_for_unknown_state_fails_build() {
        let mut data = single_competitive(Vec::new());
        data.margin_shifts.push(MarginShift {
            state_name: "Elsewhere".into(),
            margin_shift: 1.0,
        });
        assert!(build_distributions(&data, &ForecastConfig::default()).is_err());
    }

    #[test]
    fn one_distribution_per_state_in_order() {
        let data = ElectionData {
            states: vec![
                StateRecord::new("C", 3),
                StateRecord::new("A", 4),
                StateRecord::new("B", 5),
            ],
            classification: Classification {
                safe_harris: vec!["A".into()],
                safe_trump: vec!["B".into()],
                competitive: vec!["C".into()],
            },
            polls: Vec::new(),
            margin_shifts: Vec::new(),
        };
        let report = build_distributions(&data, &ForecastConfig::default()).unwrap();
        let names: Vec<_> = report
            .distributions
            .iter()
            .map(|d| d.state_name.as_str())
            .collect();
        assert_eq!(names, ["C", "A", "B"]);
        assert_eq!(report.total_electoral_votes().unwrap(), 12);
    }
}
