//! Persistent iteration log.
//!
//! An append-only, periodically checkpointed sequence of iteration
//! records. Checkpoints rewrite the complete record list as one JSON
//! document, so a crash between appends loses at most the un-flushed
//! tail and never corrupts the file on disk. Persistence is
//! best-effort: a failed checkpoint or restore is logged and the loop
//! carries on with its in-memory state.

use crate::models::{Adjustment, IterationRecord, SignalReading};
use crate::scorer::Scorer;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Persistence defects. Never fatal to the owning loop.
#[derive(Debug, Error)]
pub enum TapeError {
    #[error("failed to write iteration log to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read iteration log from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed iteration log at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Append-only log of feedback-loop iterations.
#[derive(Debug)]
pub struct IterationLog {
    filepath: PathBuf,
    records: Vec<IterationRecord>,
    next_index: u64,
    current_mood_tag: String,
}

impl IterationLog {
    /// Create an empty log that checkpoints to `filepath`.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            records: Vec::new(),
            next_index: 0,
            current_mood_tag: "neutral".to_string(),
        }
    }

    #[allow(dead_code)] // Accessor for diagnostics
    pub fn path(&self) -> &Path {
        &self.filepath
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Cumulative mood: the mood tag of the latest appended reading.
    pub fn current_mood_tag(&self) -> &str {
        &self.current_mood_tag
    }

    /// Append one iteration record.
    ///
    /// The record takes the next strictly-increasing iteration index;
    /// the log's cumulative mood follows the new reading.
    pub fn append(
        &mut self,
        proposal_output: serde_json::Value,
        reading: SignalReading,
        adjustment: Adjustment,
    ) {
        self.current_mood_tag = reading.mood_tag.clone();

        self.records.push(IterationRecord {
            iteration: self.next_index,
            proposal_output,
            reading,
            adjustment,
            timestamp: Utc::now().to_rfc3339(),
        });
        self.next_index += 1;
    }

    /// Write the full record list to disk, replacing any previous
    /// checkpoint. Failures are logged and swallowed.
    pub fn checkpoint(&self) {
        match self.try_checkpoint() {
            Ok(()) => debug!(
                "Checkpointed {} records to {}",
                self.records.len(),
                self.filepath.display()
            ),
            Err(e) => warn!("Could not checkpoint iteration log: {e}"),
        }
    }

    fn try_checkpoint(&self) -> Result<(), TapeError> {
        let json = serde_json::to_string_pretty(&self.records).map_err(|source| {
            TapeError::Malformed {
                path: self.filepath.clone(),
                source,
            }
        })?;

        std::fs::write(&self.filepath, json).map_err(|source| TapeError::Write {
            path: self.filepath.clone(),
            source,
        })
    }

    /// Load previously checkpointed records, if any.
    ///
    /// A missing file leaves the log empty without complaint; malformed
    /// content is reported and treated as empty.
    pub fn restore(&mut self) {
        match self.try_restore() {
            Ok(true) => debug!(
                "Restored {} records from {}",
                self.records.len(),
                self.filepath.display()
            ),
            Ok(false) => {}
            Err(e) => warn!("Could not restore iteration log: {e}"),
        }
    }

    fn try_restore(&mut self) -> Result<bool, TapeError> {
        let content = match std::fs::read_to_string(&self.filepath) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(TapeError::Read {
                    path: self.filepath.clone(),
                    source,
                })
            }
        };

        let records: Vec<IterationRecord> =
            serde_json::from_str(&content).map_err(|source| TapeError::Malformed {
                path: self.filepath.clone(),
                source,
            })?;

        // Indices must be 0..n with no gaps; anything else means the
        // file was edited or mixed between runs.
        let ordered = records
            .iter()
            .enumerate()
            .all(|(i, r)| r.iteration == i as u64);
        if !ordered {
            warn!(
                "Iteration log at {} has non-contiguous indices; ignoring it",
                self.filepath.display()
            );
            return Ok(false);
        }

        self.next_index = records.len() as u64;
        if let Some(last) = records.last() {
            self.current_mood_tag = last.reading.mood_tag.clone();
        }
        self.records = records;

        Ok(true)
    }

    /// The last `n` records (fewer if the log is shorter).
    pub fn last_n(&self, n: usize) -> &[IterationRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Average drift across consecutive readings in the recent window.
    ///
    /// Fewer than two records means no drift to measure.
    pub fn drift(&self, window: usize) -> f64 {
        let recent = self.last_n(window);
        if recent.len() < 2 {
            return 0.0;
        }

        let scorer = Scorer::new();
        let total: f64 = recent
            .windows(2)
            .map(|pair| scorer.measure_drift(&pair[0].reading, &pair[1].reading))
            .sum();

        total / (recent.len() - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log_with(n: usize, deltas: impl Fn(usize) -> (f64, f64, f64, f64)) -> IterationLog {
        let scorer = Scorer::new();
        let mut log = IterationLog::new("/nonexistent/never-written.json");
        for i in 0..n {
            let (a, d, de, v) = deltas(i);
            log.append(json!({"step": i}), scorer.score(a, d, de, v), Adjustment::default());
        }
        log
    }

    #[test]
    fn test_append_assigns_contiguous_indices() {
        let log = log_with(4, |_| (0.0, 0.0, 0.0, 0.0));
        let indices: Vec<u64> = log.records().iter().map(|r| r.iteration).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_append_updates_mood() {
        let scorer = Scorer::new();
        let mut log = IterationLog::new("/nonexistent/never-written.json");
        assert_eq!(log.current_mood_tag(), "neutral");

        log.append(
            json!({}),
            scorer.score(0.4, 0.4, 0.4, 0.0),
            Adjustment::default(),
        );
        assert_eq!(log.current_mood_tag(), "warm");
    }

    #[test]
    fn test_drift_needs_two_records() {
        assert_eq!(log_with(0, |_| (0.0, 0.0, 0.0, 0.0)).drift(5), 0.0);
        assert_eq!(log_with(1, |_| (0.0, 0.0, 0.0, 0.0)).drift(5), 0.0);
    }

    #[test]
    fn test_drift_zero_for_constant_readings() {
        let log = log_with(8, |_| (0.3, 0.2, 0.1, 0.05));
        assert!(log.drift(5).abs() < 1e-9);
    }

    #[test]
    fn test_drift_positive_for_swinging_readings() {
        let log = log_with(6, |i| {
            if i % 2 == 0 {
                (0.5, 0.5, 0.5, 0.0)
            } else {
                (-0.5, -0.5, -0.5, 1.0)
            }
        });
        assert!(log.drift(5) > 0.3);
    }

    #[test]
    fn test_last_n_shorter_log() {
        let log = log_with(3, |_| (0.0, 0.0, 0.0, 0.0));
        assert_eq!(log.last_n(5).len(), 3);
        assert_eq!(log.last_n(2).len(), 2);
        assert_eq!(log.last_n(2)[0].iteration, 1);
    }

    #[test]
    fn test_checkpoint_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.json");
        let scorer = Scorer::new();

        let mut log = IterationLog::new(&path);
        for i in 0..5 {
            log.append(
                json!({"step": i}),
                scorer.score(0.1 * i as f64, 0.0, 0.0, 0.0),
                Adjustment::default(),
            );
        }
        log.checkpoint();

        let mut restored = IterationLog::new(&path);
        restored.restore();

        assert_eq!(restored.len(), 5);
        assert_eq!(restored.current_mood_tag(), log.current_mood_tag());
        for (a, b) in log.records().iter().zip(restored.records()) {
            assert_eq!(a.iteration, b.iteration);
            assert_eq!(a.reading.category, b.reading.category);
            assert_eq!(a.timestamp, b.timestamp);
        }

        // Appends continue from the restored index.
        restored.append(
            json!({"step": 5}),
            scorer.score(0.0, 0.0, 0.0, 0.0),
            Adjustment::default(),
        );
        assert_eq!(restored.records().last().unwrap().iteration, 5);
    }

    #[test]
    fn test_restore_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = IterationLog::new(dir.path().join("absent.json"));
        log.restore();
        assert!(log.is_empty());
    }

    #[test]
    fn test_restore_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not json at all {{{").unwrap();

        let mut log = IterationLog::new(&path);
        log.restore();
        assert!(log.is_empty());
    }

    #[test]
    fn test_restore_rejects_gapped_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gapped.json");

        let mut log = IterationLog::new(&path);
        let scorer = Scorer::new();
        log.append(json!({}), scorer.score(0.0, 0.0, 0.0, 0.0), Adjustment::default());
        log.append(json!({}), scorer.score(0.0, 0.0, 0.0, 0.0), Adjustment::default());
        log.checkpoint();

        // Corrupt the second index.
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("\"iteration\": 1", "\"iteration\": 7")).unwrap();

        let mut restored = IterationLog::new(&path);
        restored.restore();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_checkpoint_failure_is_not_fatal() {
        let log = log_with(2, |_| (0.0, 0.0, 0.0, 0.0));
        // Path points into a directory that does not exist.
        log.checkpoint();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_repeated_checkpoint_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.json");

        let mut log = IterationLog::new(&path);
        log.append(
            json!({"step": 0}),
            Scorer::new().score(0.0, 0.0, 0.0, 0.0),
            Adjustment::default(),
        );
        log.checkpoint();
        let first = std::fs::read_to_string(&path).unwrap();
        log.checkpoint();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }
}
