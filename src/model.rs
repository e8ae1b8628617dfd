//! Plain input records consumed by the forecast.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ForecastError;

pub const POLL_WEIGHT_MIN: f64 = 1.0;
pub const POLL_WEIGHT_MAX: f64 = 10.0;

/// A state (or congressional district) and its electoral votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub name: String,
    pub electoral_votes: u32,
}

impl StateRecord {
    pub fn new(name: impl Into<String>, electoral_votes: u32) -> Self {
        Self {
            name: name.into(),
            electoral_votes,
        }
    }
}

/// One poll of a single state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRecord {
    pub state_name: String,
    pub harris_support: f64,
    pub trump_support: f64,
    pub weight: f64,
    pub moe: f64,
}

impl PollRecord {
    pub fn new(
        state_name: impl Into<String>,
        harris_support: f64,
        trump_support: f64,
        weight: f64,
        moe: f64,
    ) -> Self {
        Self {
            state_name: state_name.into(),
            harris_support,
            trump_support,
            weight,
            moe,
        }
    }

    /// Harris minus Trump, in percentage points.
    pub fn margin(&self) -> f64 {
        self.harris_support - self.trump_support
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        let invalid = |reason: String| ForecastError::InvalidRecord {
            name: self.state_name.clone(),
            reason,
        };

        for (label, value) in [
            ("harris_support", self.harris_support),
            ("trump_support", self.trump_support),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(format!("{label} {value} is outside [0, 100]")));
            }
        }

        if !(POLL_WEIGHT_MIN..=POLL_WEIGHT_MAX).contains(&self.weight) {
            return Err(invalid(format!(
                "poll weight {} is outside [{POLL_WEIGHT_MIN}, {POLL_WEIGHT_MAX}]",
                self.weight
            )));
        }

        if !(self.moe.is_finite() && self.moe >= 0.0) {
            return Err(invalid(format!(
                "margin of error {} must be finite and >= 0",
                self.moe
            )));
        }

        Ok(())
    }
}

/// Additive margin shift for one state; positive values favour Harris.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginShift {
    pub state_name: String,
    pub margin_shift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateClassification {
    SafeHarris,
    SafeTrump,
    Competitive,
}

impl fmt::Display for StateClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SafeHarris => "safe Harris",
            Self::SafeTrump => "safe Trump",
            Self::Competitive => "competitive",
        };
        f.write_str(label)
    }
}

/// The three hand-maintained state lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub safe_harris: Vec<String>,
    pub safe_trump: Vec<String>,
    pub competitive: Vec<String>,
}

impl Classification {
    /// Maps every state to exactly one classification.
    ///
    /// Fails on names absent from `states`, on names that appear in more than
    /// one list, and on states that appear in none.
    pub fn resolve(
        &self,
        states: &[StateRecord],
    ) -> Result<BTreeMap<String, StateClassification>, ForecastError> {
        let known: HashSet<&str> = states.iter().map(|s| s.name.as_str()).collect();
        let mut resolved = BTreeMap::new();

        for (kind, names) in [
            (StateClassification::SafeHarris, &self.safe_harris),
            (StateClassification::SafeTrump, &self.safe_trump),
            (StateClassification::Competitive, &self.competitive),
        ] {
            for name in names {
                if !known.contains(name.as_str()) {
                    return Err(ForecastError::UnknownState {
                        context: "classification",
                        name: name.clone(),
                    });
                }
                if let Some(first) = resolved.insert(name.clone(), kind) {
                    return Err(ForecastError::ConflictingClassification {
                        name: name.clone(),
                        first,
                        second: kind,
                    });
                }
            }
        }

        if let Some(missing) = states.iter().find(|s| !resolved.contains_key(&s.name)) {
            return Err(ForecastError::Unclassified(missing.name.clone()));
        }

        Ok(resolved)
    }
}

/// Everything a data source hands to the forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectionData {
    pub states: Vec<StateRecord>,
    pub classification: Classification,
    pub polls: Vec<PollRecord>,
    #[serde(default)]
    pub margin_shifts: Vec<MarginShift>,
}

/// Sums electoral votes, failing on the state that pushes the total past `u32`.
pub fn checked_electoral_total<'a, I>(states: I) -> Result<u32, ForecastError>
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    states.into_iter().try_fold(0u32, |total, (name, votes)| {
        total
            .checked_add(votes)
            .ok_or_else(|| ForecastError::InvalidRecord {
                name: name.to_string(),
                reason: "electoral vote total overflows".to_string(),
            })
    })
}

impl ElectionData {
    pub fn total_electoral_votes(&self) -> Result<u32, ForecastError> {
        checked_electoral_total(
            self.states
                .iter()
                .map(|s| (s.name.as_str(), s.electoral_votes)),
        )
    }

    /// Checks state records for duplicates, zero electoral votes and a total
    /// that does not fit in `u32`.
    pub fn validate_states(&self) -> Result<(), ForecastError> {
        let mut seen = HashSet::with_capacity(self.states.len());
        for state in &self.states {
            if !seen.insert(state.name.as_str()) {
                return Err(ForecastError::DuplicateState(state.name.clone()));
            }
            if state.electoral_votes == 0 {
                return Err(ForecastError::InvalidRecord {
                    name: state.name.clone(),
                    reason: "electoral votes must be positive".to_string(),
                });
            }
        }
        self.total_electoral_votes()?;
        Ok(())
    }
}
