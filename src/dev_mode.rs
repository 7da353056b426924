/// Development mode utilities for working without a database
///
/// When no PostgreSQL instance is available, use this module to replay a JSON
/// fixture of measurement records through the in-memory store.
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::logging::{self, DataSource};
use crate::model::MeasurementRecord;
use crate::store::InMemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum DevModeError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse fixture {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Configuration for development mode data replay
#[derive(Debug, Clone, Default)]
pub struct DevMode {
    /// Shift every timestamp so the newest record lands on this instant.
    pub rebase_to: Option<DateTime<Utc>>,
}

impl DevMode {
    /// Replay fixture timestamps as recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay fixture data as if the newest window had just closed at `now`.
    pub fn rebased_at(now: DateTime<Utc>) -> Self {
        Self { rebase_to: Some(now) }
    }

    /// Parses a JSON array of records. File order becomes arrival order.
    pub fn parse_fixture(&self, json: &str) -> Result<Vec<MeasurementRecord>, serde_json::Error> {
        let mut records: Vec<MeasurementRecord> = serde_json::from_str(json)?;
        if let Some(now) = self.rebase_to {
            rebase(&mut records, now);
        }
        Ok(records)
    }

    /// Loads a fixture file into a fresh in-memory store.
    pub fn load_store(&self, path: &Path) -> Result<InMemoryStore, DevModeError> {
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| DevModeError::Read {
            path: display.clone(),
            source,
        })?;
        let records = self.parse_fixture(&json).map_err(|source| DevModeError::Parse {
            path: display.clone(),
            source,
        })?;

        logging::info(
            DataSource::Dev,
            None,
            &format!("Loaded {} fixture records from {}", records.len(), display),
        );
        Ok(InMemoryStore::from_records(records))
    }
}

/// Moves all timestamps by one offset; relative spacing and ties survive.
fn rebase(records: &mut [MeasurementRecord], now: DateTime<Utc>) {
    let Some(newest) = records.iter().map(|r| r.timestamp).max() else {
        return;
    };
    let offset = now - newest;
    for record in records.iter_mut() {
        record.timestamp += offset;
    }
}
