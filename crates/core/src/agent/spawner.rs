//! Role spawner.
//!
//! Turns a work unit into a running worker process: picks the role's prompt
//! template, substitutes the rendered arguments, spawns the worker CLI, and
//! hands the child to the stream monitor. Spawn failures are reported as a
//! crashed result so phase layers treat them like any other worker failure.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::EngineConfig;

use super::monitor::{monitor_stream, AgentSpawnResult};
use super::prompts;
use super::work_unit::UnitDispatch;

/// Seam for dispatching a work unit to a worker agent.
///
/// The production implementation spawns real processes; tests substitute
/// scripted doubles.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, dispatch: &UnitDispatch) -> AgentSpawnResult;
}

/// Spawns the worker CLI (`claude` by default) in stream-json mode
pub struct ClaudeRunner {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ClaudeRunner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            program: config.agent_program.clone(),
            leading_args: config.agent_args.clone(),
            timeout: config.unit_timeout(),
            working_dir: config.project_root.clone(),
        }
    }

    fn build_prompt(dispatch: &UnitDispatch) -> String {
        let mut arguments = dispatch.unit.render_arguments();
        if let Some(continuation) = &dispatch.continuation {
            arguments.push_str("\n\nContinue from:\n");
            arguments.push_str(continuation);
        }
        prompts::render(prompts::for_role(dispatch.unit.role()), &arguments)
    }
}

#[async_trait]
impl AgentRunner for ClaudeRunner {
    #[tracing::instrument(skip(self, dispatch), fields(role = %dispatch.unit.role()))]
    async fn run(&self, dispatch: &UnitDispatch) -> AgentSpawnResult {
        let prompt = Self::build_prompt(dispatch);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        if let Some(session) = &dispatch.resume_session {
            cmd.arg("--resume").arg(session);
        }
        cmd.arg("-p").arg(prompt);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(error = %e, "failed to spawn worker, reporting crash");
                return AgentSpawnResult::spawn_failure();
            }
        };

        match monitor_stream(child, self.timeout).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "worker monitoring failed, reporting crash");
                AgentSpawnResult::spawn_failure()
            }
        }
    }
}
