//! Agent registry and coordination.
//!
//! The coordinator does not execute anything itself. It reads the
//! registered agents' telemetry (latency, reading score, return on
//! effort), produces an advisory [`CoordinationReport`], and applies
//! the suggested adjustments back to the ensemble.

use crate::blender::Blender;
use crate::models::{CandidateAction, CoordinationReport, SignalReading};
use crate::pacing::PacingMonitor;
use crate::scorer::Scorer;
use crate::suppressor::{SuppressionAudit, Suppressor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One scoring agent in the ensemble.
///
/// Owned exclusively by the coordinator once registered; mutated only
/// through the `apply_*` hooks after a coordination pass. Agents are
/// never removed during a session.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub voice_tag: String,
    /// Last observed latency in seconds.
    pub latency: f64,
    /// Current reading score, in [0, 1].
    pub reading_score: f64,
    /// Return-on-effort estimate for this agent's proposals.
    pub return_on_effort: f64,
    /// Description of the most recent quality violation, if any.
    pub last_violation: String,
}

impl Agent {
    pub fn new(name: impl Into<String>, voice_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice_tag: voice_tag.into(),
            latency: 0.0,
            reading_score: 0.8,
            return_on_effort: 15.0,
            last_violation: String::new(),
        }
    }
}

/// Reactions to a coordination report.
///
/// [`Agent`] supplies the baseline reactions; member types that
/// schedule their own work override the pacing and arrangement hooks.
pub trait Responsive {
    /// Apply a reading-score adjustment.
    fn apply_reading(&mut self, adjustment: f64);

    /// React to a pacing adjustment. Defaults to a no-op.
    fn apply_pacing(&mut self, _adjustment: f64) {}

    /// React to the names of suppressed actions. Defaults to a no-op;
    /// the coordinator only suggests.
    fn apply_arrangement(&mut self, _suppressed: &[String]) {}
}

impl Responsive for Agent {
    fn apply_reading(&mut self, adjustment: f64) {
        self.reading_score = (self.reading_score + adjustment).clamp(0.0, 1.0);
    }
}

/// Deliver a coordination report to one responsive member.
pub fn apply_report<M: Responsive>(member: &mut M, report: &CoordinationReport) {
    member.apply_reading(report.reading_adjustment);
    member.apply_pacing(report.pacing_adjustment);
    member.apply_arrangement(&report.suppressed_actions);
}

/// Configuration for a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Expected seconds per coordination cycle (pacing threshold).
    pub expected_cycle_seconds: f64,
    /// Minimum reading score for candidate actions to survive.
    pub quality_threshold: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            expected_cycle_seconds: 30.0,
            quality_threshold: 0.5,
        }
    }
}

/// Aggregate view of the whole ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub ensemble_size: usize,
    /// Blended ad-hoc reading across all agents.
    pub blended_reading: SignalReading,
    pub avg_latency: f64,
    pub avg_return_on_effort: f64,
    /// Agents with a reading score below 0.6.
    pub dissonant_agents: usize,
    /// Pairs of agents whose readings resonate.
    pub resonant_pairs: usize,
}

/// Summary of one beat of a conducted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatSummary {
    pub beat: usize,
    pub elapsed_seconds: f64,
    pub pacing_adjustment: f64,
    pub reading_adjustment: f64,
    pub latency_outliers: usize,
    pub quality_clashes: usize,
    pub suppressed_actions: usize,
}

/// Report from a multi-beat conducted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_beats: usize,
    pub beats: Vec<BeatSummary>,
    /// Average reading score across the ensemble after the last beat.
    pub final_avg_reading: f64,
    pub suppression_audit: SuppressionAudit,
}

/// Coordinates an ordered ensemble of agents.
///
/// Registration order is significant: reports iterate agents in that
/// order, keeping output deterministic.
pub struct Coordinator {
    monitor: PacingMonitor,
    scorer: Scorer,
    blender: Blender,
    suppressor: Suppressor,
    ensemble: Vec<Agent>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            monitor: PacingMonitor::new(config.expected_cycle_seconds),
            scorer: Scorer::new(),
            blender: Blender::new(),
            suppressor: Suppressor::new(config.quality_threshold),
            ensemble: Vec::new(),
        }
    }

    /// Register an agent. Duplicate names are permitted; deduplication
    /// is the caller's responsibility.
    pub fn register(&mut self, agent: Agent) {
        debug!("Registering agent '{}' ({})", agent.name, agent.voice_tag);
        self.ensemble.push(agent);
    }

    pub fn agents(&self) -> &[Agent] {
        &self.ensemble
    }

    #[allow(dead_code)] // For callers updating agent telemetry in place
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.ensemble
    }

    /// Produce an advisory report from the current ensemble telemetry.
    ///
    /// An empty ensemble degrades to a zero-valued report rather than
    /// erroring.
    pub fn coordinate(&mut self) -> CoordinationReport {
        if self.ensemble.is_empty() {
            return CoordinationReport::default();
        }

        let latency_outliers: Vec<f64> = self
            .ensemble
            .iter()
            .filter(|a| a.latency > self.monitor.threshold())
            .map(|a| a.latency)
            .collect();

        let quality_clashes: Vec<String> = self
            .ensemble
            .iter()
            .filter(|a| a.reading_score < 0.7 && !a.last_violation.is_empty())
            .map(|a| a.last_violation.clone())
            .collect();

        // Profitable-but-questionable candidates, one per flagged agent.
        let candidates: Vec<CandidateAction> = self
            .ensemble
            .iter()
            .filter(|a| a.return_on_effort < 10.0 || a.reading_score < 0.5)
            .map(|a| CandidateAction {
                name: a.name.clone(),
                value_potential: a.return_on_effort * 100_000.0,
                reading_score: a.reading_score,
                reason: format!(
                    "return-on-effort {} but reading {:.2}",
                    a.return_on_effort, a.reading_score
                ),
            })
            .collect();

        let outcome = self.suppressor.remove(candidates);

        let pacing_adjustment = self.monitor.calibrate(&latency_outliers);
        let reading_adjustment = self.blender.resolve_clashes(&quality_clashes);

        CoordinationReport {
            pacing_adjustment,
            reading_adjustment,
            suppressed_actions: outcome.suppressed.into_iter().map(|s| s.name).collect(),
            latency_outliers,
            quality_clashes,
        }
    }

    /// Apply a coordination report back to every agent.
    pub fn apply(&mut self, report: &CoordinationReport) {
        for agent in &mut self.ensemble {
            apply_report(agent, report);
        }
    }

    /// Run `beats` full coordination cycles: beat, coordinate, apply.
    pub fn conduct(&mut self, beats: usize) -> PerformanceReport {
        let mut summaries = Vec::with_capacity(beats);

        for beat in 0..beats {
            let elapsed = self.monitor.beat();
            let report = self.coordinate();
            self.apply(&report);

            info!(
                "Beat {}: pacing {:+.2}, reading {:+.2}, {} suppressed",
                beat + 1,
                report.pacing_adjustment,
                report.reading_adjustment,
                report.suppressed_actions.len()
            );

            summaries.push(BeatSummary {
                beat: beat + 1,
                elapsed_seconds: elapsed,
                pacing_adjustment: report.pacing_adjustment,
                reading_adjustment: report.reading_adjustment,
                latency_outliers: report.latency_outliers.len(),
                quality_clashes: report.quality_clashes.len(),
                suppressed_actions: report.suppressed_actions.len(),
            });
        }

        let final_avg_reading = if self.ensemble.is_empty() {
            0.0
        } else {
            self.ensemble.iter().map(|a| a.reading_score).sum::<f64>()
                / self.ensemble.len() as f64
        };

        PerformanceReport {
            total_beats: beats,
            beats: summaries,
            final_avg_reading,
            suppression_audit: self.suppressor.audit(),
        }
    }

    /// Aggregate view of the whole ensemble.
    ///
    /// The resonance count is an exact all-pairs check and therefore
    /// O(n^2); fine for ensembles of tens of agents, a known scaling
    /// limit beyond that.
    pub fn snapshot(&self) -> RoomSnapshot {
        if self.ensemble.is_empty() {
            return RoomSnapshot {
                ensemble_size: 0,
                blended_reading: SignalReading::neutral(),
                avg_latency: 0.0,
                avg_return_on_effort: 0.0,
                dissonant_agents: 0,
                resonant_pairs: 0,
            };
        }

        let n = self.ensemble.len() as f64;

        let readings: Vec<SignalReading> = self
            .ensemble
            .iter()
            .map(|a| {
                let autonomy_delta = if a.reading_score > 0.7 { 0.1 } else { -0.1 };
                self.scorer
                    .score(autonomy_delta, 0.05, 0.0, a.return_on_effort)
            })
            .collect();

        let pair_readings: Vec<SignalReading> = self
            .ensemble
            .iter()
            .map(|a| self.scorer.score(a.reading_score, 0.0, 0.0, 0.0))
            .collect();

        let mut resonant_pairs = 0;
        for i in 0..pair_readings.len() {
            for j in (i + 1)..pair_readings.len() {
                if self.blender.check_resonance(&pair_readings[i], &pair_readings[j]) {
                    resonant_pairs += 1;
                }
            }
        }

        RoomSnapshot {
            ensemble_size: self.ensemble.len(),
            blended_reading: self.blender.blend(&readings),
            avg_latency: self.ensemble.iter().map(|a| a.latency).sum::<f64>() / n,
            avg_return_on_effort: self.ensemble.iter().map(|a| a.return_on_effort).sum::<f64>()
                / n,
            dissonant_agents: self
                .ensemble
                .iter()
                .filter(|a| a.reading_score < 0.6)
                .count(),
            resonant_pairs,
        }
    }
}
