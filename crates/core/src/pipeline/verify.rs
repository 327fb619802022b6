//! Verification gate.
//!
//! Runs the external check command between build and audit. A failing run
//! dispatches fix workers over the files implicated by the check report,
//! then re-runs the checks. Three failed runs is a hard pipeline failure.

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

use crate::agent::parallel::run_in_windows;
use crate::agent::spawner::AgentRunner;
use crate::agent::work_unit::{UnitDispatch, WorkUnit};
use crate::config::EngineConfig;
use crate::quest::Quest;

/// Total check runs before giving up
pub const MAX_CHECK_ATTEMPTS: u32 = 3;

/// Result of one check run
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub passed: bool,
    pub output: String,
}

/// Seam for the external check command
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run_checks(&self) -> Result<CheckOutcome>;
}

/// Runs the configured check command as a child process
pub struct CommandCheckRunner {
    command: Vec<String>,
    working_dir: Option<std::path::PathBuf>,
}

impl CommandCheckRunner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            command: config.check_command.clone(),
            working_dir: config.project_root.clone(),
        }
    }
}

#[async_trait]
impl CheckRunner for CommandCheckRunner {
    async fn run_checks(&self) -> Result<CheckOutcome> {
        let (program, args) = self
            .command
            .split_first()
            .context("check command is empty")?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to run check command: {program}"))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CheckOutcome {
            passed: output.status.success(),
            output: combined,
        })
    }
}

// Failure report shape emitted by the check command. Everything defaults so
// partial reports still yield whatever paths they carry.
#[derive(Debug, Deserialize)]
struct CheckReport {
    #[serde(default)]
    checks: Vec<CheckEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckEntry {
    #[serde(default)]
    project_results: Vec<ProjectResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResult {
    #[serde(default)]
    errors: Vec<ReportedError>,
    #[serde(default)]
    test_failures: Vec<ReportedTestFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportedError {
    #[serde(default)]
    file_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportedTestFailure {
    #[serde(default)]
    suite_path: String,
}

/// Pull absolute file paths out of the check output's JSON report.
///
/// The report may be the whole output or one line of it. Relative paths are
/// discarded; order is preserved and duplicates dropped.
pub fn extract_failure_paths(output: &str) -> Vec<String> {
    let report = serde_json::from_str::<CheckReport>(output)
        .ok()
        .or_else(|| {
            output
                .lines()
                .find_map(|line| serde_json::from_str::<CheckReport>(line).ok())
        });

    let Some(report) = report else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    let mut push = |path: &str| {
        if Path::new(path).is_absolute() && !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    };

    for check in &report.checks {
        for project in &check.project_results {
            for error in &project.errors {
                push(&error.file_path);
            }
            for failure in &project.test_failures {
                push(&failure.suite_path);
            }
        }
    }
    paths
}

fn fallback_paths(quest: &Quest) -> Vec<String> {
    let mut paths = Vec::new();
    for step in &quest.steps {
        for path in step.touched_files() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Run the verification gate to completion.
///
/// Error text accumulates across attempts so a later fix worker sees every
/// failure observed so far, not just the latest run's.
#[tracing::instrument(skip_all, fields(quest = %quest.id))]
pub async fn run_verification_gate<R, C>(
    runner: &Arc<R>,
    checks: &C,
    quest: &Quest,
    window: usize,
    check_command: &str,
) -> Result<()>
where
    R: AgentRunner + ?Sized + 'static,
    C: CheckRunner + ?Sized,
{
    let mut accumulated_errors: Vec<String> = Vec::new();

    for attempt in 1..=MAX_CHECK_ATTEMPTS {
        let outcome = checks
            .run_checks()
            .await
            .context("check command could not be executed")?;

        if outcome.passed {
            tracing::info!(attempt, "verification checks passed");
            return Ok(());
        }

        tracing::warn!(attempt, "verification checks failed");
        accumulated_errors.push(outcome.output.clone());

        if attempt == MAX_CHECK_ATTEMPTS {
            bail!("verification phase failed after {MAX_CHECK_ATTEMPTS} retries");
        }

        let mut paths = extract_failure_paths(&outcome.output);
        if paths.is_empty() {
            paths = fallback_paths(quest);
        }
        if paths.is_empty() {
            bail!("verification checks failed and no file paths could be extracted for fix agents");
        }

        let fix = WorkUnit::for_fix(paths, Some(accumulated_errors.clone()), check_command);
        // the re-run of the checks, not the fix worker's signal, decides
        let _ = run_in_windows(runner, vec![UnitDispatch::new(fix)], window).await;
    }

    unreachable!("loop exits via pass or bail")
}
