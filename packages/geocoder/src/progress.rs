//! Resumable geocode progress store.
//!
//! Geocoding a citation batch against a 1 req/sec public endpoint
//! takes hours, and runs get interrupted. Every outcome, including
//! failures, is appended to a CSV keyed by citation id as soon as it
//! is known; on restart the worker pool skips ids already present.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sweepcast_models::ConfidenceTier;

use crate::GeocodeError;

/// One recorded geocode outcome. Failures are recorded too, so a rerun
/// does not retry addresses the provider cannot resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeOutcome {
    /// Citation identifier.
    pub id: String,
    /// Resolved latitude, when the result was usable.
    pub latitude: Option<f64>,
    /// Resolved longitude, when the result was usable.
    pub longitude: Option<f64>,
    /// Display address the provider returned.
    pub returned_address: Option<String>,
    /// Validation score in `[0, 100]`.
    pub score: u8,
    /// Validation tier derived from the score.
    pub tier: ConfidenceTier,
}

/// Append-only CSV store of geocode outcomes.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    /// Opens a store at the given path. The file is created lazily on
    /// first append.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store's backing path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all recorded outcomes. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file exists but cannot be read.
    pub fn load(&self) -> Result<Vec<GeocodeOutcome>, GeocodeError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut outcomes = Vec::new();
        for result in reader.deserialize() {
            outcomes.push(result?);
        }
        Ok(outcomes)
    }

    /// The set of citation ids already recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the store cannot be read.
    pub fn completed_ids(&self) -> Result<BTreeSet<String>, GeocodeError> {
        Ok(self.load()?.into_iter().map(|o| o.id).collect())
    }

    /// Appends one outcome, flushing before returning so an interrupt
    /// loses at most the in-flight record.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on I/O or CSV failure.
    pub fn append(&self, outcome: &GeocodeOutcome) -> Result<(), GeocodeError> {
        let write_header = self
            .path
            .metadata()
            .map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(outcome)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, score: u8) -> GeocodeOutcome {
        GeocodeOutcome {
            id: id.to_string(),
            latitude: Some(37.76),
            longitude: Some(-122.42),
            returned_address: Some("Mission Street, San Francisco".to_string()),
            score,
            tier: ConfidenceTier::from_score(score),
        }
    }

    #[test]
    fn appends_and_reloads() {
        let path = std::env::temp_dir().join("sweepcast_progress_reload.csv");
        std::fs::remove_file(&path).ok();
        let store = ProgressStore::open(&path);

        store.append(&outcome("CIT-1", 100)).unwrap();
        store.append(&outcome("CIT-2", 40)).unwrap();

        let loaded = store.load().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "CIT-1");
        assert_eq!(loaded[1].tier, ConfidenceTier::Low);
    }

    #[test]
    fn missing_file_is_empty() {
        let path = std::env::temp_dir().join("sweepcast_progress_missing.csv");
        std::fs::remove_file(&path).ok();
        let store = ProgressStore::open(&path);
        assert!(store.load().unwrap().is_empty());
        assert!(store.completed_ids().unwrap().is_empty());
    }

    #[test]
    fn records_failures_for_resume() {
        let path = std::env::temp_dir().join("sweepcast_progress_failures.csv");
        std::fs::remove_file(&path).ok();
        let store = ProgressStore::open(&path);

        store
            .append(&GeocodeOutcome {
                id: "CIT-9".to_string(),
                latitude: None,
                longitude: None,
                returned_address: None,
                score: 0,
                tier: ConfidenceTier::Failed,
            })
            .unwrap();

        let ids = store.completed_ids().unwrap();
        std::fs::remove_file(&path).ok();
        assert!(ids.contains("CIT-9"));
    }
}
