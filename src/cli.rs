//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chorus - ensemble telemetry and self-correcting feedback loop engine
///
/// Drives scored feedback-loop iterations against a persisted log,
/// coordinates a configured agent ensemble, and checks persisted logs
/// for reading drift.
///
/// Examples:
///   chorus run --iterations 12
///   chorus run --tape /tmp/tape.json --autonomy-delta 0.4
///   chorus coordinate --beats 4
///   chorus check --tape /tmp/tape.json
///   chorus init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .chorus.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run feedback-loop iterations with a fixed-delta proposer
    Run {
        /// Number of iterations to run
        #[arg(short, long, default_value = "12", value_name = "COUNT")]
        iterations: usize,

        /// Iteration log path (overrides config)
        #[arg(long, value_name = "FILE")]
        tape: Option<PathBuf>,

        /// Autonomy delta reported by the proposer each iteration
        #[arg(long, default_value = "0.3", value_name = "DELTA")]
        autonomy_delta: f64,

        /// Dignity delta reported by the proposer each iteration
        #[arg(long, default_value = "0.2", value_name = "DELTA")]
        dignity_delta: f64,

        /// Defense delta reported by the proposer each iteration
        #[arg(long, default_value = "0.1", value_name = "DELTA")]
        defense_delta: f64,

        /// Value delta reported by the proposer each iteration
        #[arg(long, default_value = "0.05", value_name = "DELTA")]
        value_delta: f64,
    },

    /// Conduct coordination beats over the configured ensemble
    Coordinate {
        /// Number of beats to conduct
        #[arg(short, long, default_value = "1", value_name = "COUNT")]
        beats: usize,
    },

    /// Check a persisted iteration log for reading drift
    ///
    /// Exit code 1 when the check reports FAIL or ERROR.
    Check {
        /// Iteration log path (overrides config)
        #[arg(long, value_name = "FILE")]
        tape: Option<PathBuf>,
    },

    /// Generate a default .chorus.toml configuration file
    InitConfig,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Run { iterations, .. } => {
                if *iterations == 0 {
                    return Err("Iterations must be at least 1".to_string());
                }
            }
            Command::Coordinate { beats } => {
                if *beats == 0 {
                    return Err("Beats must be at least 1".to_string());
                }
            }
            Command::Check { .. } | Command::InitConfig => {}
        }

        Ok(())
    }

    /// The tape path override from the active subcommand, if any.
    pub fn tape_override(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Run { tape, .. } | Command::Check { tape } => tape.as_ref(),
            _ => None,
        }
    }

    /// Returns the log level from the verbosity flags and the config
    /// file's verbose setting. `--quiet` wins over everything.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
