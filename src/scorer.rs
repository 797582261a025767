//! Signal scoring.
//!
//! The scorer turns four raw per-axis deltas into a [`SignalReading`].
//! It is pure and total: any finite input produces a reading, and the
//! scalar outputs are always clamped into [0, 1].

use crate::models::{Category, SignalReading};

/// Stateless scorer for per-action alignment readings.
///
/// Asks three questions of every action: was it generous or extractive,
/// did it empower or diminish, and is the signal clean or muddy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer;

impl Scorer {
    pub fn new() -> Self {
        Self
    }

    /// Score an action from its impact deltas.
    ///
    /// `autonomy_delta`, `dignity_delta`, and `defense_delta` are
    /// expected in [-1, 1]; `value_delta` can be any finite value.
    /// Category selection is first-match-wins in the order below, so
    /// overlapping conditions resolve deterministically.
    pub fn score(
        &self,
        autonomy_delta: f64,
        dignity_delta: f64,
        defense_delta: f64,
        value_delta: f64,
    ) -> SignalReading {
        let generosity_signal = (autonomy_delta + dignity_delta + defense_delta) / 3.0;

        let category = if autonomy_delta < -0.3 || dignity_delta < -0.3 {
            Category::Diminishing
        } else if value_delta > 0.0 && generosity_signal < -0.1 {
            Category::Extractive
        } else if generosity_signal > 0.3 {
            Category::Generous
        } else if autonomy_delta > 0.2 || dignity_delta > 0.2 {
            Category::Empowering
        } else if generosity_signal.abs() < 0.1 && value_delta.abs() < 0.1 {
            Category::Clean
        } else if value_delta > 0.0 && generosity_signal < 0.0 {
            Category::Muddy
        } else {
            Category::Warm
        };

        // Confidence scales with signal clarity, capped below certainty.
        let signal_clarity = generosity_signal.abs() + autonomy_delta.abs();
        let confidence = (0.6 + signal_clarity * 0.3).min(0.95);

        SignalReading {
            category,
            confidence,
            generosity: (0.5 + generosity_signal).clamp(0.0, 1.0),
            autonomy: (0.5 + autonomy_delta).clamp(0.0, 1.0),
            mood_tag: category.mood_tag().to_string(),
            autonomy_delta,
            dignity_delta,
            defense_delta,
            value_delta,
        }
    }

    /// True if a reading is dissonant: categorized extractive,
    /// diminishing, or muddy, or scoring below the halfway mark.
    #[allow(dead_code)] // Utility for upstream scoring consumers
    pub fn is_dissonant(&self, reading: &SignalReading) -> bool {
        matches!(
            reading.category,
            Category::Extractive | Category::Diminishing | Category::Muddy
        ) || reading.overall_score() < 0.5
    }

    /// Drift magnitude between two readings, in [0, 1].
    ///
    /// Mean of the absolute differences in overall score, generosity,
    /// and autonomy. Used by the iteration log's drift window.
    pub fn measure_drift(&self, a: &SignalReading, b: &SignalReading) -> f64 {
        let score_drift = (a.overall_score() - b.overall_score()).abs();
        let generosity_drift = (a.generosity - b.generosity).abs();
        let autonomy_drift = (a.autonomy - b.autonomy).abs();

        (score_drift + generosity_drift + autonomy_drift) / 3.0
    }
}
