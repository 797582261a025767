//! Aggregate blending and conflict resolution.
//!
//! The blender combines per-agent readings into one aggregate reading,
//! converts a set of quality clashes into a numeric penalty, and checks
//! pairwise resonance between readings.

use crate::models::{Category, SignalReading};

/// Blends multiple readings into one and resolves pairwise conflicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blender;

/// Category pairs considered compatible for resonance.
const COMPATIBLE_PAIRS: [(Category, Category); 4] = [
    (Category::Generous, Category::Empowering),
    (Category::Clean, Category::Warm),
    (Category::Generous, Category::Warm),
    (Category::Empowering, Category::Warm),
];

impl Blender {
    pub fn new() -> Self {
        Self
    }

    /// Blend readings into a single aggregate reading.
    ///
    /// Scalars and deltas are averaged. The dominant category is the
    /// most frequent one, ties broken by first encounter in input
    /// order. An empty input yields the neutral CLEAN reading.
    pub fn blend(&self, readings: &[SignalReading]) -> SignalReading {
        if readings.is_empty() {
            return SignalReading::neutral();
        }

        let n = readings.len() as f64;
        let avg = |f: fn(&SignalReading) -> f64| readings.iter().map(f).sum::<f64>() / n;

        // Most frequent category, first-encountered wins ties.
        let mut seen: Vec<(Category, usize)> = Vec::new();
        for reading in readings {
            match seen.iter_mut().find(|(c, _)| *c == reading.category) {
                Some((_, count)) => *count += 1,
                None => seen.push((reading.category, 1)),
            }
        }
        let mut dominant = Category::Clean;
        let mut best = 0;
        for (category, count) in &seen {
            // Strictly greater, so a tied later category never displaces
            // an earlier one.
            if *count > best {
                best = *count;
                dominant = *category;
            }
        }

        let warm = readings.iter().filter(|r| r.mood_tag == "warm").count();
        let cold = readings.iter().filter(|r| r.mood_tag == "cold").count();
        let muddy = readings.iter().filter(|r| r.mood_tag == "muddy").count();

        let mood_tag = if warm as f64 > n / 2.0 {
            "warm"
        } else if cold as f64 > n / 3.0 {
            "cold"
        } else if muddy as f64 > n / 3.0 {
            "muddy"
        } else {
            "neutral"
        };

        SignalReading {
            category: dominant,
            confidence: avg(|r| r.confidence),
            generosity: avg(|r| r.generosity),
            autonomy: avg(|r| r.autonomy),
            mood_tag: mood_tag.to_string(),
            autonomy_delta: avg(|r| r.autonomy_delta),
            dignity_delta: avg(|r| r.dignity_delta),
            defense_delta: avg(|r| r.defense_delta),
            value_delta: avg(|r| r.value_delta),
        }
    }

    /// Convert a set of quality clashes into a reading adjustment.
    ///
    /// More clashes mean a larger negative adjustment, saturating at
    /// ten clashes. No clashes means no adjustment.
    pub fn resolve_clashes(&self, violations: &[String]) -> f64 {
        if violations.is_empty() {
            return 0.0;
        }

        let severity = (violations.len() as f64 / 10.0).min(1.0);
        -severity * 0.5
    }

    /// True if two readings resonate: same category, a compatible
    /// category pair, or overall scores within 0.2 of each other.
    pub fn check_resonance(&self, a: &SignalReading, b: &SignalReading) -> bool {
        if a.category == b.category {
            return true;
        }

        for (x, y) in COMPATIBLE_PAIRS {
            if (a.category == x && b.category == y) || (a.category == y && b.category == x) {
                return true;
            }
        }

        (a.overall_score() - b.overall_score()).abs() < 0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Scorer;

    #[test]
    fn test_blend_empty_is_neutral_clean() {
        let blended = Blender::new().blend(&[]);
        assert_eq!(blended.category, Category::Clean);
        assert_eq!(blended.mood_tag, "neutral");
        assert!((blended.generosity - 0.5).abs() < f64::EPSILON);
        assert!((blended.autonomy - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blend_averages_scalars() {
        let scorer = Scorer::new();
        let readings = vec![
            scorer.score(0.4, 0.4, 0.4, 0.0),
            scorer.score(0.0, 0.0, 0.0, 0.0),
        ];
        let blended = Blender::new().blend(&readings);

        let expected_generosity = (readings[0].generosity + readings[1].generosity) / 2.0;
        assert!((blended.generosity - expected_generosity).abs() < 1e-9);
        assert!((blended.autonomy_delta - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_blend_dominant_category() {
        let scorer = Scorer::new();
        let readings = vec![
            scorer.score(0.4, 0.4, 0.4, 0.0), // generous
            scorer.score(0.4, 0.4, 0.4, 0.0), // generous
            scorer.score(0.0, 0.0, 0.0, 0.0), // clean
        ];
        let blended = Blender::new().blend(&readings);
        assert_eq!(blended.category, Category::Generous);
    }

    #[test]
    fn test_blend_tie_breaks_by_input_order() {
        let scorer = Scorer::new();
        let readings = vec![
            scorer.score(0.0, 0.0, 0.0, 0.0), // clean
            scorer.score(0.4, 0.4, 0.4, 0.0), // generous
        ];
        let blended = Blender::new().blend(&readings);
        assert_eq!(blended.category, Category::Clean);
    }

    #[test]
    fn test_blend_later_majority_still_wins() {
        let scorer = Scorer::new();
        let readings = vec![
            scorer.score(0.0, 0.0, 0.0, 0.0), // clean
            scorer.score(0.4, 0.4, 0.4, 0.0), // generous
            scorer.score(0.4, 0.4, 0.4, 0.0), // generous
        ];
        let blended = Blender::new().blend(&readings);
        assert_eq!(blended.category, Category::Generous);
    }

    #[test]
    fn test_blend_warm_majority_mood() {
        let scorer = Scorer::new();
        let readings = vec![
            scorer.score(0.4, 0.4, 0.4, 0.0),
            scorer.score(0.4, 0.4, 0.4, 0.0),
            scorer.score(0.0, 0.0, 0.0, 0.0),
        ];
        let blended = Blender::new().blend(&readings);
        assert_eq!(blended.mood_tag, "warm");
    }

    #[test]
    fn test_blend_cold_minority_mood() {
        let scorer = Scorer::new();
        // Two cold readings out of four crosses the one-third gate.
        let readings = vec![
            scorer.score(-0.5, -0.5, -0.5, 1.0),
            scorer.score(-0.5, -0.5, -0.5, 1.0),
            scorer.score(0.0, 0.0, 0.0, 0.0),
            scorer.score(0.0, 0.0, 0.0, 0.0),
        ];
        let blended = Blender::new().blend(&readings);
        assert_eq!(blended.mood_tag, "cold");
    }

    #[test]
    fn test_resolve_no_clashes_is_zero() {
        assert_eq!(Blender::new().resolve_clashes(&[]), 0.0);
    }

    #[test]
    fn test_resolve_clashes_scales_and_saturates() {
        let blender = Blender::new();
        let clash = |n: usize| vec!["late settlement".to_string(); n];

        assert!((blender.resolve_clashes(&clash(2)) + 0.1).abs() < 1e-9);
        assert!((blender.resolve_clashes(&clash(10)) + 0.5).abs() < 1e-9);
        // Saturates past ten.
        assert!((blender.resolve_clashes(&clash(25)) + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_same_category_resonates() {
        let scorer = Scorer::new();
        let a = scorer.score(0.4, 0.4, 0.4, 0.0);
        let b = scorer.score(0.5, 0.5, 0.5, 0.0);
        assert!(Blender::new().check_resonance(&a, &b));
    }

    #[test]
    fn test_compatible_pair_resonates() {
        let scorer = Scorer::new();
        let generous = scorer.score(0.4, 0.4, 0.4, 0.0);
        let empowering = scorer.score(0.25, 0.0, 0.0, 0.0);
        assert_eq!(generous.category, Category::Generous);
        assert_eq!(empowering.category, Category::Empowering);
        assert!(Blender::new().check_resonance(&generous, &empowering));
    }

    #[test]
    fn test_distant_scores_do_not_resonate() {
        let scorer = Scorer::new();
        let generous = scorer.score(0.6, 0.6, 0.6, 0.0);
        let diminishing = scorer.score(-0.8, -0.8, -0.8, 0.0);
        assert!(!Blender::new().check_resonance(&generous, &diminishing));
    }
}
