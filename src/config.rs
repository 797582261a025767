//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.chorus.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Pacing monitor settings.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Suppressor settings.
    #[serde(default)]
    pub suppressor: SuppressorConfig,

    /// Iteration log settings.
    #[serde(default)]
    pub tape: TapeConfig,

    /// Agents registered into the ensemble for coordination runs.
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Pacing monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Expected seconds per coordination cycle; doubles as the latency
    /// outlier threshold.
    #[serde(default = "default_cycle_seconds")]
    pub expected_cycle_seconds: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            expected_cycle_seconds: default_cycle_seconds(),
        }
    }
}

fn default_cycle_seconds() -> f64 {
    30.0
}

/// Suppressor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressorConfig {
    /// Minimum reading score for a candidate action to survive.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
}

impl Default for SuppressorConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
        }
    }
}

fn default_quality_threshold() -> f64 {
    0.5
}

/// Iteration log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapeConfig {
    /// Checkpoint file path.
    #[serde(default = "default_tape_path")]
    pub path: String,
}

impl Default for TapeConfig {
    fn default() -> Self {
        Self {
            path: default_tape_path(),
        }
    }
}

fn default_tape_path() -> String {
    "chorus_tape.json".to_string()
}

/// One configured ensemble agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,

    #[serde(default = "default_voice_tag")]
    pub voice_tag: String,

    /// Last observed latency in seconds.
    #[serde(default)]
    pub latency: f64,

    #[serde(default = "default_reading_score")]
    pub reading_score: f64,

    #[serde(default = "default_return_on_effort")]
    pub return_on_effort: f64,

    /// Most recent quality violation, if any.
    #[serde(default)]
    pub last_violation: String,
}

fn default_voice_tag() -> String {
    "neutral".to_string()
}

fn default_reading_score() -> f64 {
    0.8
}

fn default_return_on_effort() -> f64 {
    15.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".chorus.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(tape) = args.tape_override() {
            self.tape.path = tape.display().to_string();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config {
            agents: vec![AgentConfig {
                name: "example-agent".to_string(),
                voice_tag: default_voice_tag(),
                latency: 0.0,
                reading_score: default_reading_score(),
                return_on_effort: default_return_on_effort(),
                last_violation: String::new(),
            }],
            ..Config::default()
        };
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pacing.expected_cycle_seconds, 30.0);
        assert_eq!(config.suppressor.quality_threshold, 0.5);
        assert_eq!(config.tape.path, "chorus_tape.json");
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[pacing]
expected_cycle_seconds = 10.0

[suppressor]
quality_threshold = 0.7

[tape]
path = "/var/lib/chorus/tape.json"

[[agents]]
name = "underwriting"
voice_tag = "cello"
latency = 12.5

[[agents]]
name = "scouting"
return_on_effort = 8.0
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.pacing.expected_cycle_seconds, 10.0);
        assert_eq!(config.suppressor.quality_threshold, 0.7);
        assert_eq!(config.tape.path, "/var/lib/chorus/tape.json");
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agents[0].voice_tag, "cello");
        // Unspecified agent fields take their defaults.
        assert_eq!(config.agents[1].reading_score, 0.8);
        assert_eq!(config.agents[1].return_on_effort, 8.0);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[pacing]"));
        assert!(toml_str.contains("[suppressor]"));
        assert!(toml_str.contains("[tape]"));
        assert!(toml_str.contains("[[agents]]"));
        // The generated file must parse back.
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agents.len(), 1);
    }
}
