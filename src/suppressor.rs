//! Policy-based suppression of low-quality candidate actions.
//!
//! Profitable actions still get dropped when their reading falls below
//! the quality threshold. The suppressor keeps a running count and an
//! audit trail of everything it removes.

use crate::models::CandidateAction;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Red-flag substrings that suppress an action regardless of score.
///
/// Defense-in-depth on top of the numeric threshold, not a replacement
/// for it.
const RED_FLAGS: [&str; 6] = [
    "exploit",
    "bypass",
    "circumvent",
    "hide",
    "obfuscate",
    "manipulate",
];

/// A suppressed action, logged for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedAction {
    pub name: String,
    pub value_foregone: f64,
    pub reason: String,
    pub reading_score: f64,
}

/// Result of one suppression pass: a stable partition of the input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuppressionOutcome {
    /// Candidates that passed the quality threshold, in input order.
    pub kept: Vec<CandidateAction>,
    /// Candidates removed this pass, in input order.
    pub suppressed: Vec<SuppressedAction>,
    /// Total value given up by suppressing.
    pub value_foregone: f64,
}

/// Summary of everything suppressed so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionAudit {
    pub total_suppressed: u64,
    pub threshold: f64,
    pub message: String,
}

/// Filters candidate actions whose reading falls below a threshold.
#[derive(Debug, Clone)]
pub struct Suppressor {
    quality_threshold: f64,
    suppressed_count: u64,
}

impl Suppressor {
    /// Create a suppressor with the given minimum reading score.
    pub fn new(quality_threshold: f64) -> Self {
        Self {
            quality_threshold,
            suppressed_count: 0,
        }
    }

    #[allow(dead_code)] // Accessor for external policy checks
    pub fn threshold(&self) -> f64 {
        self.quality_threshold
    }

    /// Partition candidates by the quality threshold.
    ///
    /// Every candidate lands in exactly one side; the counter
    /// increments once per suppressed candidate.
    pub fn remove(&mut self, candidates: Vec<CandidateAction>) -> SuppressionOutcome {
        let mut outcome = SuppressionOutcome::default();

        for candidate in candidates {
            if candidate.reading_score < self.quality_threshold {
                debug!(
                    "Suppressing '{}' (score {:.2}, value {:.0} foregone)",
                    candidate.name, candidate.reading_score, candidate.value_potential
                );
                outcome.value_foregone += candidate.value_potential;
                outcome.suppressed.push(SuppressedAction {
                    name: candidate.name,
                    value_foregone: candidate.value_potential,
                    reason: candidate.reason,
                    reading_score: candidate.reading_score,
                });
                self.suppressed_count += 1;
            } else {
                outcome.kept.push(candidate);
            }
        }

        outcome
    }

    /// True if an action should be suppressed: reading below threshold,
    /// or a red-flag substring in its textual descriptor.
    #[allow(dead_code)] // Single-action check for upstream gating
    pub fn should_suppress(&self, action_descriptor: &str, reading_score: f64) -> bool {
        if reading_score < self.quality_threshold {
            return true;
        }

        let text = action_descriptor.to_lowercase();
        RED_FLAGS.iter().any(|flag| text.contains(flag))
    }

    /// Audit what has been suppressed so far.
    pub fn audit(&self) -> SuppressionAudit {
        SuppressionAudit {
            total_suppressed: self.suppressed_count,
            threshold: self.quality_threshold,
            message: format!(
                "Suppressed {} low-quality actions to preserve signal integrity.",
                self.suppressed_count
            ),
        }
    }
}

impl Default for Suppressor {
    fn default() -> Self {
        Self::new(0.5)
    }
}
