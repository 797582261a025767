//! Standalone drift check over a persisted iteration log.
//!
//! A read-only consumer of the on-disk log schema: it never loads the
//! engine, just the JSON records, so it can run against a log produced
//! by any process. Reads defensively - missing reading fields fall
//! back to the neutral baseline.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Outcome classification of a drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Empty,
    Pass,
    Warning,
    Fail,
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Empty => write!(f, "EMPTY"),
            CheckStatus::Pass => write!(f, "PASS"),
            CheckStatus::Warning => write!(f, "WARNING"),
            CheckStatus::Fail => write!(f, "FAIL"),
            CheckStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl CheckStatus {
    /// Marker glyph for terminal output.
    pub fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Fail => "✗",
            CheckStatus::Empty => "○",
            CheckStatus::Error => "⚠",
        }
    }

    /// True if the check should fail the invoking process.
    pub fn is_failure(&self) -> bool {
        matches!(self, CheckStatus::Fail | CheckStatus::Error)
    }
}

/// Drift-check report over the full persisted history.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_drift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_iterations: Option<usize>,
}

impl CheckReport {
    fn bare(status: CheckStatus, message: String) -> Self {
        Self {
            status,
            message,
            avg_drift: None,
            max_drift: None,
            total_iterations: None,
        }
    }
}

/// Overall score of one record's reading, with neutral defaults for
/// anything missing.
fn record_score(record: &serde_json::Value) -> f64 {
    let reading = &record["reading"];
    let field = |key: &str| reading.get(key).and_then(|v| v.as_f64()).unwrap_or(0.5);

    (field("confidence") + field("generosity") + field("autonomy")) / 3.0
}

/// Check a persisted iteration log for score drift.
///
/// Pairwise drift over the full history; FAIL when any consecutive
/// pair drifts past 0.3, WARNING when the average exceeds 0.1.
pub fn check_log(path: &Path) -> CheckReport {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return CheckReport::bare(
                CheckStatus::Empty,
                format!("Iteration log not found at {}", path.display()),
            );
        }
        Err(e) => {
            return CheckReport::bare(
                CheckStatus::Error,
                format!("Error reading iteration log: {e}"),
            );
        }
    };

    let records: Vec<serde_json::Value> = match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => {
            return CheckReport::bare(
                CheckStatus::Error,
                format!("Invalid JSON in iteration log: {e}"),
            );
        }
    };

    debug!("Checking {} persisted records", records.len());

    if records.is_empty() {
        return CheckReport::bare(
            CheckStatus::Empty,
            "No iterations recorded yet".to_string(),
        );
    }

    if records.len() < 2 {
        return CheckReport::bare(
            CheckStatus::Pass,
            "Not enough iterations to measure drift".to_string(),
        );
    }

    let drifts: Vec<f64> = records
        .windows(2)
        .map(|pair| (record_score(&pair[0]) - record_score(&pair[1])).abs())
        .collect();

    let avg_drift = drifts.iter().sum::<f64>() / drifts.len() as f64;
    let max_drift = drifts.iter().cloned().fold(0.0, f64::max);

    let (status, message) = if max_drift > 0.3 {
        (
            CheckStatus::Fail,
            format!("Excessive reading drift detected: {max_drift:.3} > 0.3"),
        )
    } else if avg_drift > 0.1 {
        (
            CheckStatus::Warning,
            format!("Moderate reading drift: {avg_drift:.3} > 0.1"),
        )
    } else {
        (
            CheckStatus::Pass,
            format!("Reading drift within acceptable range: {avg_drift:.3}"),
        )
    };

    CheckReport {
        status,
        message,
        avg_drift: Some(avg_drift),
        max_drift: Some(max_drift),
        total_iterations: Some(records.len()),
    }
}
