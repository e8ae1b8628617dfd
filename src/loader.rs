//! Election data sources.
//!
//! A data directory holds `states_info.csv`, three plain-text state lists
//! and `polling_data.csv`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::model::{Classification, ElectionData, MarginShift, PollRecord, StateRecord};
use crate::ForecastError;

pub const STATES_FILE: &str = "states_info.csv";
pub const SAFE_HARRIS_FILE: &str = "safe_states_harris.txt";
pub const SAFE_TRUMP_FILE: &str = "safe_states_trump.txt";
pub const COMPETITIVE_FILE: &str = "competitive_states.txt";
pub const POLLS_FILE: &str = "polling_data.csv";

pub trait ElectionDataSource {
    fn load(&self) -> Result<ElectionData, ForecastError>;
}

/// Reads the standard data files from one directory.
#[derive(Debug, Clone)]
pub struct DirectoryDataSource {
    pub data_dir: PathBuf,
    /// Optional `state_name,margin_shift` CSV
    pub margin_shift_file: Option<PathBuf>,
}

impl DirectoryDataSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            margin_shift_file: None,
        }
    }

    pub fn with_margin_shifts(mut self, path: impl Into<PathBuf>) -> Self {
        self.margin_shift_file = Some(path.into());
        self
    }

    fn open(&self, file: &str) -> Result<File, ForecastError> {
        Ok(File::open(self.data_dir.join(file))?)
    }
}

impl ElectionDataSource for DirectoryDataSource {
    fn load(&self) -> Result<ElectionData, ForecastError> {
        let states = read_states(self.open(STATES_FILE)?)?;
        let classification = Classification {
            safe_harris: read_state_list(self.open(SAFE_HARRIS_FILE)?)?,
            safe_trump: read_state_list(self.open(SAFE_TRUMP_FILE)?)?,
            competitive: read_state_list(self.open(COMPETITIVE_FILE)?)?,
        };
        let polls = read_polls(self.open(POLLS_FILE)?)?;
        let margin_shifts = match &self.margin_shift_file {
            Some(path) => read_margin_shifts(File::open(path)?)?,
            None => Vec::new(),
        };

        tracing::debug!(
            dir = %self.data_dir.display(),
            states = states.len(),
            polls = polls.len(),
            margin_shifts = margin_shifts.len(),
            "loaded election data"
        );

        Ok(ElectionData {
            states,
            classification,
            polls,
            margin_shifts,
        })
    }
}

/// Serves data that is already in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    pub data: ElectionData,
}

impl StaticDataSource {
    pub fn new(data: ElectionData) -> Self {
        Self { data }
    }
}

impl ElectionDataSource for StaticDataSource {
    fn load(&self) -> Result<ElectionData, ForecastError> {
        Ok(self.data.clone())
    }
}

pub fn read_states<R: Read>(reader: R) -> Result<Vec<StateRecord>, ForecastError> {
    read_csv(reader)
}

pub fn read_polls<R: Read>(reader: R) -> Result<Vec<PollRecord>, ForecastError> {
    read_csv(reader)
}

pub fn read_margin_shifts<R: Read>(reader: R) -> Result<Vec<MarginShift>, ForecastError> {
    read_csv(reader)
}

/// One state name per line; blank lines are skipped.
pub fn read_state_list<R: Read>(reader: R) -> Result<Vec<String>, ForecastError> {
    let mut names = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

pub fn load_directory(data_dir: &Path) -> Result<ElectionData, ForecastError> {
    DirectoryDataSource::new(data_dir).load()
}

fn read_csv<R: Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>, ForecastError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}
