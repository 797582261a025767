//! Chorus - Ensemble Telemetry & Feedback Loop Engine
//!
//! A CLI around a self-correcting scoring loop: per-agent signal
//! readings, aggregate blending, policy-based suppression, and a
//! persisted iteration log with drift checking.
//!
//! Exit codes:
//!   0 - Success (including drift checks that report PASS/WARNING/EMPTY)
//!   1 - Runtime error, or a drift check reporting FAIL/ERROR

mod blender;
mod check;
mod cli;
mod config;
mod ensemble;
mod feedback;
mod models;
mod pacing;
mod scorer;
mod suppressor;
mod tape;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat};
use config::Config;
use ensemble::{Agent, Coordinator, CoordinatorConfig};
use feedback::{FeedbackLoop, FixedDeltaProposer};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Config is loaded before the subscriber so a `verbose = true`
    // in .chorus.toml can raise the log level.
    let (mut config, config_source) = load_config(&args)?;
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("Chorus v{}", env!("CARGO_PKG_VERSION"));
    info!("{config_source}");
    debug!("Arguments: {:?}", args);

    let exit_code = match args.command.clone() {
        Command::Run {
            iterations,
            autonomy_delta,
            dignity_delta,
            defense_delta,
            value_delta,
            ..
        } => handle_run(
            &config,
            &args,
            iterations,
            FixedDeltaProposer {
                autonomy_delta,
                dignity_delta,
                defense_delta,
                value_delta,
            },
        )?,
        Command::Coordinate { beats } => handle_coordinate(&config, &args, beats)?,
        Command::Check { .. } => handle_check(&config, &args)?,
        Command::InitConfig => unreachable!("handled above"),
    };

    std::process::exit(exit_code);
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
///
/// Runs before the tracing subscriber exists, so the config source is
/// returned as a message for the caller to log.
fn load_config(args: &Args) -> Result<(Config, String)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((
            config,
            format!("Loaded config from {}", config_path.display()),
        ));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, "Loaded config from .chorus.toml".to_string())),
        Ok(None) => Ok((
            Config::default(),
            "No config file found, using defaults".to_string(),
        )),
        Err(e) => Ok((
            Config::default(),
            format!("Failed to load config ({e}), using defaults"),
        )),
    }
}

/// Handle init-config: generate a default .chorus.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".chorus.toml");

    if path.exists() {
        eprintln!("⚠️  .chorus.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .chorus.toml")?;

    println!("✅ Created .chorus.toml with default settings.");
    println!("   Edit it to set the tape path, thresholds, and the agent ensemble.");
    Ok(())
}

/// Run feedback-loop iterations with a fixed-delta proposer.
fn handle_run(
    config: &Config,
    args: &Args,
    iterations: usize,
    proposer: FixedDeltaProposer,
) -> Result<i32> {
    let tape_path = PathBuf::from(&config.tape.path);
    println!("∞ Running {} iterations (tape: {})", iterations, tape_path.display());

    let mut log = tape::IterationLog::new(&tape_path);
    log.restore();
    if !log.is_empty() {
        info!("Resuming from {} persisted iterations", log.len());
    }

    let mut feedback = FeedbackLoop::new(proposer, log);

    for i in 0..iterations {
        let outcome = feedback.run_iteration(&serde_json::json!({ "round": i }));
        debug!(
            "Iteration {}: {} ({:.2})",
            i,
            outcome.reading.category,
            outcome.reading.overall_score()
        );
    }

    // Flush the tail that the periodic checkpoint hasn't covered.
    feedback.log().checkpoint();

    let health = feedback.health();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
        OutputFormat::Text => {
            println!("\n🔍 Loop Health:");
            println!("   Status: {}", health.status);
            println!("   Drift: {:.3}", health.drift);
            println!("   Average reading: {:.2}", health.avg_reading_score);
            println!("   Mood: {}", health.current_mood_tag);
            println!("   Total iterations: {}", health.total_iterations);
            println!("   Recommendation: {}", health.recommendation);
        }
    }

    Ok(0)
}

/// Conduct coordination beats over the configured ensemble.
fn handle_coordinate(config: &Config, args: &Args, beats: usize) -> Result<i32> {
    if config.agents.is_empty() {
        warn!("No agents configured; coordination will be a no-op");
    }

    let mut coordinator = Coordinator::new(CoordinatorConfig {
        expected_cycle_seconds: config.pacing.expected_cycle_seconds,
        quality_threshold: config.suppressor.quality_threshold,
    });

    for agent_config in &config.agents {
        let mut agent = Agent::new(&agent_config.name, &agent_config.voice_tag);
        agent.latency = agent_config.latency;
        agent.reading_score = agent_config.reading_score;
        agent.return_on_effort = agent_config.return_on_effort;
        agent.last_violation = agent_config.last_violation.clone();
        coordinator.register(agent);
    }

    println!(
        "🎧 Conducting {} beat(s) over {} agent(s)",
        beats,
        coordinator.agents().len()
    );

    let performance = coordinator.conduct(beats);
    let snapshot = coordinator.snapshot();

    match args.format {
        OutputFormat::Json => {
            let combined = serde_json::json!({
                "performance": performance,
                "snapshot": snapshot,
            });
            println!("{}", serde_json::to_string_pretty(&combined)?);
        }
        OutputFormat::Text => {
            for beat in &performance.beats {
                println!(
                    "   Beat {}: pacing {:+.2}, reading {:+.2}, {} outlier(s), {} clash(es), {} suppressed",
                    beat.beat,
                    beat.pacing_adjustment,
                    beat.reading_adjustment,
                    beat.latency_outliers,
                    beat.quality_clashes,
                    beat.suppressed_actions
                );
            }
            println!("\n📊 Ensemble Snapshot:");
            println!("   Agents: {}", snapshot.ensemble_size);
            println!("   Blended reading: {} ({})", snapshot.blended_reading.category, snapshot.blended_reading.mood_tag);
            println!("   Average latency: {:.1}s", snapshot.avg_latency);
            println!("   Average return-on-effort: {:.1}", snapshot.avg_return_on_effort);
            println!("   Dissonant agents: {}", snapshot.dissonant_agents);
            println!("   Resonant pairs: {}", snapshot.resonant_pairs);
            println!("   Final average reading: {:.2}", performance.final_avg_reading);
            println!("   {}", performance.suppression_audit.message);
        }
    }

    Ok(0)
}

/// Check a persisted iteration log for reading drift.
fn handle_check(config: &Config, args: &Args) -> Result<i32> {
    let tape_path = PathBuf::from(&config.tape.path);
    let report = check::check_log(&tape_path);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{} Drift check: {}", report.status.symbol(), report.message);
            if let (Some(avg), Some(max), Some(total)) =
                (report.avg_drift, report.max_drift, report.total_iterations)
            {
                println!("  Average drift: {:.3}", avg);
                println!("  Maximum drift: {:.3}", max);
                println!("  Total iterations: {}", total);
            }
        }
    }

    Ok(if report.status.is_failure() { 1 } else { 0 })
}
