//! Questforge CLI
//!
//! Loads a quest file, wires up the real process runners, and drives the
//! pipeline, logging every phase transition.

use anyhow::Result;
use clap::Parser;
use questforge_core::agent::spawner::ClaudeRunner;
use questforge_core::config::EngineConfig;
use questforge_core::pipeline::coordinator::PipelineCoordinator;
use questforge_core::pipeline::verify::CommandCheckRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "questforge", about = "Run a quest through the agent pipeline")]
struct Cli {
    /// Path to the quest JSON file
    quest: PathBuf,

    /// Maximum worker agents running at once
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    /// Per-unit timeout in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Worker agent program
    #[arg(long, default_value = "claude")]
    agent: String,

    /// Verification check command (space separated, program first)
    #[arg(long, default_value = "questforge-check run all-checks")]
    check: String,

    /// Working directory for worker and check processes
    #[arg(long)]
    project_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = EngineConfig {
        max_concurrent: cli.concurrency,
        unit_timeout_secs: cli.timeout,
        agent_program: cli.agent,
        check_command: cli.check.split_whitespace().map(str::to_string).collect(),
        project_root: cli.project_root,
        ..EngineConfig::default()
    };

    let runner = Arc::new(ClaudeRunner::new(&config));
    let checks = Arc::new(CommandCheckRunner::new(&config));

    let mut coordinator = PipelineCoordinator::new(config, runner, checks, |phase| {
        tracing::info!(%phase, "pipeline phase");
    });

    let summary = coordinator.run(&cli.quest).await?;
    tracing::info!(
        build_satisfied = summary.build.satisfied.len(),
        build_dropped = summary.build.dropped,
        audit_satisfied = summary.audit.satisfied.len(),
        audit_dropped = summary.audit.dropped,
        review_satisfied = summary.review.satisfied.len(),
        review_dropped = summary.review.dropped,
        "quest pipeline complete"
    );
    Ok(())
}
