//! The self-correcting feedback loop.
//!
//! Drives one proposer through iterations: propose, score, derive an
//! adjustment, append to the iteration log, checkpoint periodically.
//! A dissonant reading biases the next iteration's adjustment toward
//! correction, but the correction is advisory - the proposer is free
//! to ignore it.

use crate::models::{Adjustment, Category, Pacing, SignalReading};
use crate::scorer::Scorer;
use crate::tape::IterationLog;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Checkpoint the log every this many appends.
const CHECKPOINT_EVERY: usize = 10;

/// Number of recent records considered for drift and health.
const HEALTH_WINDOW: usize = 5;

/// Anything that can propose an action from an input mapping.
///
/// Concrete proposers live upstream (underwriting, scouting,
/// governance); the loop only needs this one capability.
pub trait Proposer {
    fn propose(&mut self, input: &serde_json::Value) -> serde_json::Value;
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationOutcome {
    /// Raw proposer output.
    pub data: serde_json::Value,
    /// Reading scored from the output.
    pub reading: SignalReading,
    /// The log's cumulative mood after this iteration.
    pub mood_tag: String,
}

/// Loop stability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStatus {
    Stable,
    Drifting,
    Unstable,
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopStatus::Stable => write!(f, "stable"),
            LoopStatus::Drifting => write!(f, "drifting"),
            LoopStatus::Unstable => write!(f, "unstable"),
        }
    }
}

/// Loop-health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopHealth {
    pub status: LoopStatus,
    pub drift: f64,
    /// Average overall reading score across the recent window.
    pub avg_reading_score: f64,
    pub total_iterations: u64,
    pub current_mood_tag: String,
    pub recommendation: String,
}

/// Drives one proposer through scored, logged iterations.
pub struct FeedbackLoop<P: Proposer> {
    proposer: P,
    log: IterationLog,
    scorer: Scorer,
}

impl<P: Proposer> FeedbackLoop<P> {
    /// Create a loop around a proposer and an iteration log. The log
    /// may already contain restored records; new iterations continue
    /// from its index.
    pub fn new(proposer: P, log: IterationLog) -> Self {
        Self {
            proposer,
            log,
            scorer: Scorer::new(),
        }
    }

    pub fn log(&self) -> &IterationLog {
        &self.log
    }

    /// Run one iteration: propose, score, adjust, append.
    ///
    /// Delta fields missing from the proposer output default to zero.
    /// Every tenth append triggers a checkpoint.
    pub fn run_iteration(&mut self, input: &serde_json::Value) -> IterationOutcome {
        let output = self.proposer.propose(input);

        let delta = |key: &str| output.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let reading = self.scorer.score(
            delta("autonomy_delta"),
            delta("dignity_delta"),
            delta("defense_delta"),
            delta("value_delta"),
        );

        let adjustment = derive_adjustment(&reading);
        debug!(
            "Iteration {}: {} reading, {} pacing",
            self.log.len(),
            reading.category,
            adjustment.pacing
        );

        self.log.append(output.clone(), reading.clone(), adjustment);

        if self.log.len() % CHECKPOINT_EVERY == 0 {
            self.log.checkpoint();
        }

        IterationOutcome {
            data: output,
            reading,
            mood_tag: self.log.current_mood_tag().to_string(),
        }
    }

    /// Report the loop's stability over the recent window.
    pub fn health(&self) -> LoopHealth {
        let drift = self.log.drift(HEALTH_WINDOW);
        let recent = self.log.last_n(HEALTH_WINDOW);

        let avg_reading_score = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|r| r.reading.overall_score()).sum::<f64>() / recent.len() as f64
        };

        let status = if drift > 0.3 {
            LoopStatus::Unstable
        } else if drift > 0.1 {
            LoopStatus::Drifting
        } else {
            LoopStatus::Stable
        };

        LoopHealth {
            status,
            drift,
            avg_reading_score,
            total_iterations: self.log.len() as u64,
            current_mood_tag: self.log.current_mood_tag().to_string(),
            recommendation: recommend(status, drift, avg_reading_score),
        }
    }
}

/// Table-driven correction by category: extractive outputs get softer
/// and more generous, diminishing ones hand power back, muddy ones
/// slow down, and clean ones push forward.
pub fn derive_adjustment(reading: &SignalReading) -> Adjustment {
    match reading.category {
        Category::Extractive => Adjustment {
            gain: -0.2,
            generosity_adj: 0.3,
            pacing: Pacing::Slower,
            ..Default::default()
        },
        Category::Diminishing => Adjustment {
            power_transfer: 0.5,
            empowerment: 0.4,
            pacing: Pacing::Warmer,
            ..Default::default()
        },
        Category::Muddy => Adjustment {
            gain: -0.1,
            generosity_adj: 0.1,
            pacing: Pacing::Slower,
            ..Default::default()
        },
        _ => Adjustment {
            gain: 0.1,
            pacing: Pacing::Steady,
            ..Default::default()
        },
    }
}

fn recommend(status: LoopStatus, drift: f64, avg_score: f64) -> String {
    if status == LoopStatus::Unstable {
        "Loop is unstable. Consider resetting or adjusting proposer parameters.".to_string()
    } else if drift > 0.1 && avg_score < 0.5 {
        "Loop is drifting toward dissonance. Apply corrective adjustments.".to_string()
    } else if avg_score > 0.8 {
        "Loop is healthy and resonant. Continue current trajectory.".to_string()
    } else {
        "Loop is stable. Monitor for drift.".to_string()
    }
}

/// Proposer that always reports the same deltas. Useful for demo runs
/// and loop calibration.
#[derive(Debug, Clone)]
pub struct FixedDeltaProposer {
    pub autonomy_delta: f64,
    pub dignity_delta: f64,
    pub defense_delta: f64,
    pub value_delta: f64,
}

impl Default for FixedDeltaProposer {
    fn default() -> Self {
        Self {
            autonomy_delta: 0.3,
            dignity_delta: 0.2,
            defense_delta: 0.1,
            value_delta: 0.05,
        }
    }
}

impl Proposer for FixedDeltaProposer {
    fn propose(&mut self, input: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "proposal": "fixed-delta action",
            "input": input,
            "autonomy_delta": self.autonomy_delta,
            "dignity_delta": self.dignity_delta,
            "defense_delta": self.defense_delta,
            "value_delta": self.value_delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoProposer(serde_json::Value);

    impl Proposer for EchoProposer {
        fn propose(&mut self, _input: &serde_json::Value) -> serde_json::Value {
            self.0.clone()
        }
    }

    fn loop_with(output: serde_json::Value) -> FeedbackLoop<EchoProposer> {
        FeedbackLoop::new(
            EchoProposer(output),
            IterationLog::new("/nonexistent/never-written.json"),
        )
    }

    #[test]
    fn test_missing_delta_fields_default_to_zero() {
        let mut feedback = loop_with(json!({"proposal": "bare"}));
        let outcome = feedback.run_iteration(&json!({}));
        assert_eq!(outcome.reading.category, Category::Clean);
        assert_eq!(outcome.mood_tag, "neutral");
    }

    #[test]
    fn test_extractive_output_gets_corrective_adjustment() {
        let mut feedback = loop_with(json!({
            "autonomy_delta": -0.2, "dignity_delta": -0.1,
            "defense_delta": -0.1, "value_delta": 0.5,
        }));
        feedback.run_iteration(&json!({}));

        let record = feedback.log().records().last().unwrap().clone();
        assert_eq!(record.reading.category, Category::Extractive);
        assert_eq!(record.adjustment.gain, -0.2);
        assert_eq!(record.adjustment.generosity_adj, 0.3);
        assert_eq!(record.adjustment.pacing, Pacing::Slower);
    }

    #[test]
    fn test_diminishing_output_transfers_power() {
        let mut feedback = loop_with(json!({"autonomy_delta": -0.5}));
        feedback.run_iteration(&json!({}));

        let record = feedback.log().records().last().unwrap().clone();
        assert_eq!(record.adjustment.power_transfer, 0.5);
        assert_eq!(record.adjustment.empowerment, 0.4);
        assert_eq!(record.adjustment.pacing, Pacing::Warmer);
    }

    #[test]
    fn test_clean_output_pushes_forward() {
        let mut feedback = loop_with(json!({}));
        feedback.run_iteration(&json!({}));

        let record = feedback.log().records().last().unwrap().clone();
        assert_eq!(record.adjustment.gain, 0.1);
        assert_eq!(record.adjustment.pacing, Pacing::Steady);
    }

    #[test]
    fn test_fresh_loop_health_is_stable() {
        let feedback = loop_with(json!({}));
        let health = feedback.health();
        assert_eq!(health.status, LoopStatus::Stable);
        assert_eq!(health.drift, 0.0);
        assert_eq!(health.total_iterations, 0);
    }

    #[test]
    fn test_single_iteration_health_is_stable() {
        let mut feedback = loop_with(json!({}));
        feedback.run_iteration(&json!({}));

        let health = feedback.health();
        assert_eq!(health.status, LoopStatus::Stable);
        assert_eq!(health.drift, 0.0);
        assert_eq!(health.total_iterations, 1);
    }

    #[test]
    fn test_swinging_outputs_destabilize_health() {
        struct SwingProposer(usize);
        impl Proposer for SwingProposer {
            fn propose(&mut self, _input: &serde_json::Value) -> serde_json::Value {
                self.0 += 1;
                if self.0 % 2 == 0 {
                    json!({"autonomy_delta": 0.5, "dignity_delta": 0.5, "defense_delta": 0.5})
                } else {
                    json!({"autonomy_delta": -0.5, "dignity_delta": -0.5, "value_delta": 1.0})
                }
            }
        }

        let mut feedback = FeedbackLoop::new(
            SwingProposer(0),
            IterationLog::new("/nonexistent/never-written.json"),
        );
        for _ in 0..6 {
            feedback.run_iteration(&json!({}));
        }

        let health = feedback.health();
        assert_eq!(health.status, LoopStatus::Unstable);
        assert!(health.drift > 0.3);
        assert!(health.recommendation.contains("unstable"));
    }

    #[test]
    fn test_end_to_end_stable_loop_with_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.json");

        let mut feedback =
            FeedbackLoop::new(FixedDeltaProposer::default(), IterationLog::new(&path));

        for i in 0..12 {
            let outcome = feedback.run_iteration(&json!({"round": i}));
            assert!(matches!(
                outcome.reading.category,
                Category::Generous | Category::Empowering
            ));
            // The tenth append flushes the first checkpoint.
            if i < 9 {
                assert!(!path.exists());
            } else {
                assert!(path.exists());
            }
        }

        let health = feedback.health();
        assert_eq!(health.status, LoopStatus::Stable);
        assert!(health.drift < 1e-9);
        assert_eq!(health.total_iterations, 12);

        // The checkpoint on disk holds exactly the first ten records.
        let persisted: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(persisted.len(), 10);
    }

    #[test]
    fn test_high_score_recommendation() {
        let mut feedback = loop_with(json!({
            "autonomy_delta": 0.5, "dignity_delta": 0.5, "defense_delta": 0.5,
        }));
        for _ in 0..3 {
            feedback.run_iteration(&json!({}));
        }

        let health = feedback.health();
        assert!(health.avg_reading_score > 0.8);
        assert!(health.recommendation.contains("Continue"));
    }
}
