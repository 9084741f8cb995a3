/// Snapshot sources feeding the pipeline: JSON files and the demo simulator
use log::debug;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;

use crate::models::Reading;
use crate::schema::FieldSet;

pub const DEFAULT_SIMULATOR_CAPACITY: usize = 200;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not a JSON array of readings: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode a snapshot: a JSON array of reading objects.
///
/// Malformed timestamps and field values inside a record are kept as
/// missing data; only a document that is not an array of objects fails.
pub fn parse_snapshot<F>(json: &str) -> Result<Vec<Reading<F>>, serde_json::Error>
where
    F: FieldSet + DeserializeOwned,
{
    serde_json::from_str(json)
}

/// Read and decode a snapshot file.
pub async fn load_snapshot<F>(path: &Path) -> Result<Vec<Reading<F>>, SourceError>
where
    F: FieldSet + DeserializeOwned,
{
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let readings = parse_snapshot(&json).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Loaded {} readings from {}", readings.len(), path.display());
    Ok(readings)
}

/// Demo data source: one new reading per tick, oldest dropped past capacity.
#[derive(Debug, Clone)]
pub struct Simulator<F> {
    tick: u64,
    capacity: usize,
    history: VecDeque<Reading<F>>,
}

impl<F: FieldSet> Simulator<F> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Simulator {
            tick: 0,
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a reading stamped `now` and return the current history.
    pub fn next_snapshot(&mut self, now: OffsetDateTime) -> Vec<Reading<F>> {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history
            .push_back(Reading::new(now, F::simulate(self.tick)));
        self.tick += 1;

        self.history.iter().cloned().collect()
    }
}
