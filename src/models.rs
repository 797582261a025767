//! Data models for the ensemble feedback engine.
//!
//! This module contains the core data structures shared across the
//! scorer, blender, suppressor, coordinator, and the persisted
//! iteration log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Impact classification of a scored action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Neutral action with no meaningful deltas.
    Clean,
    /// Mildly positive, no strong signal either way.
    Warm,
    /// Conflicting signals - value gained while alignment dips.
    Muddy,
    /// Value extracted at the cost of alignment.
    Extractive,
    /// Autonomy or dignity reduced outright.
    Diminishing,
    /// Strongly positive alignment across the board.
    Generous,
    /// Autonomy or dignity increased.
    Empowering,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Clean => write!(f, "clean"),
            Category::Warm => write!(f, "warm"),
            Category::Muddy => write!(f, "muddy"),
            Category::Extractive => write!(f, "extractive"),
            Category::Diminishing => write!(f, "diminishing"),
            Category::Generous => write!(f, "generous"),
            Category::Empowering => write!(f, "empowering"),
        }
    }
}

impl Category {
    /// Mood tag derived from the category.
    pub fn mood_tag(&self) -> &'static str {
        match self {
            Category::Generous | Category::Empowering => "warm",
            Category::Extractive | Category::Diminishing => "cold",
            Category::Muddy => "muddy",
            _ => "neutral",
        }
    }
}

/// A normalized measurement of how aligned an action is.
///
/// Immutable once created; the scorer is the only producer of fresh
/// readings, the blender the only producer of aggregate ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReading {
    /// Derived impact classification.
    pub category: Category,
    /// Clarity of the signal, in [0, 1].
    pub confidence: f64,
    /// Generosity axis, in [0, 1].
    pub generosity: f64,
    /// Autonomy axis, in [0, 1].
    pub autonomy: f64,
    /// Mood tag: "warm", "cold", "muddy", or "neutral".
    pub mood_tag: String,
    /// Raw input delta: change in autonomy.
    pub autonomy_delta: f64,
    /// Raw input delta: change in dignity.
    pub dignity_delta: f64,
    /// Raw input delta: change in collective defense.
    pub defense_delta: f64,
    /// Raw input delta: change in captured value.
    pub value_delta: f64,
}

impl SignalReading {
    /// A neutral CLEAN reading with all scalars at their baseline.
    pub fn neutral() -> Self {
        Self {
            category: Category::Clean,
            confidence: 0.6,
            generosity: 0.5,
            autonomy: 0.5,
            mood_tag: "neutral".to_string(),
            autonomy_delta: 0.0,
            dignity_delta: 0.0,
            defense_delta: 0.0,
            value_delta: 0.0,
        }
    }

    /// Overall reading score: mean of confidence, generosity, autonomy.
    pub fn overall_score(&self) -> f64 {
        (self.confidence + self.generosity + self.autonomy) / 3.0
    }
}

/// Scheduling-cadence suggestion attached to an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    Slower,
    #[default]
    Steady,
    Warmer,
    Faster,
}

impl fmt::Display for Pacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pacing::Slower => write!(f, "slower"),
            Pacing::Steady => write!(f, "steady"),
            Pacing::Warmer => write!(f, "warmer"),
            Pacing::Faster => write!(f, "faster"),
        }
    }
}

/// Corrective instructions derived from one reading, applied (or not)
/// by the proposer on the next iteration. Advisory, never binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Adjustment {
    /// Intensity adjustment.
    pub gain: f64,
    /// Generosity adjustment.
    pub generosity_adj: f64,
    /// Power transfer adjustment.
    pub power_transfer: f64,
    /// Empowerment adjustment.
    pub empowerment: f64,
    /// Cadence suggestion.
    pub pacing: Pacing,
}

/// A candidate action that is profitable but possibly low-quality.
///
/// Transient input to the suppressor; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAction {
    /// Action name (usually the originating agent's name).
    pub name: String,
    /// Estimated value if the action were taken.
    pub value_potential: f64,
    /// Reading score of the action, in [0, 1].
    pub reading_score: f64,
    /// Why this candidate was flagged.
    pub reason: String,
}

/// Advisory summary produced once per coordination pass.
///
/// Recomputed fresh each pass; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinationReport {
    /// Suggested pacing adjustment, in [-0.5, 0].
    pub pacing_adjustment: f64,
    /// Suggested reading-score adjustment, in [-0.5, 0].
    pub reading_adjustment: f64,
    /// Names of actions the suppressor removed this pass.
    pub suppressed_actions: Vec<String>,
    /// Latencies that exceeded the pacing threshold.
    pub latency_outliers: Vec<f64>,
    /// Violation descriptions from low-scoring agents.
    pub quality_clashes: Vec<String>,
}

/// A single persisted entry of the feedback loop.
///
/// Append-only; `iteration` is strictly increasing with no gaps within
/// one log. The on-disk schema of this type is stable - the drift-check
/// utility reads it independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index.
    pub iteration: u64,
    /// Raw proposer output for this iteration.
    pub proposal_output: serde_json::Value,
    /// Reading scored from the proposal output.
    pub reading: SignalReading,
    /// Adjustment derived for the next iteration.
    pub adjustment: Adjustment,
    /// RFC 3339 timestamp of the append.
    pub timestamp: String,
}
