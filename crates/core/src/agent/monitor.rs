//! Process stream monitor.
//!
//! Supervises a spawned worker: reads its stdout line by line, applies the
//! stream protocol, enforces the wall-clock timeout, and reaps the exit
//! status into an [`AgentSpawnResult`].

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;

use super::stream::{parse_line, StreamEvent, StreamSignal};

/// Everything observed from one worker run.
///
/// Worker-level failures (crash, timeout, silence) are data here, never
/// errors: the phase layers decide what to do with them.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpawnResult {
    /// Session id, first one seen wins
    pub session_id: Option<String>,
    /// Exit code; None when the process was killed
    pub exit_code: Option<i32>,
    /// Last well-formed signal on the stream
    pub signal: Option<StreamSignal>,
    /// Nonzero exit that was not caused by the timeout kill
    pub crashed: bool,
    /// Killed after exceeding the timeout
    pub timed_out: bool,
    /// Assistant text lines in stream order
    pub captured_output: Vec<String>,
}

impl AgentSpawnResult {
    /// Synthetic result for a worker that never ran (spawn failure, panic)
    pub fn spawn_failure() -> Self {
        Self {
            crashed: true,
            ..Self::default()
        }
    }

    /// Whether the worker reported full completion
    pub fn is_complete(&self) -> bool {
        matches!(self.signal, Some(StreamSignal::Complete { .. }))
    }

    fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::SessionStarted(id) => {
                if self.session_id.is_none() {
                    self.session_id = Some(id);
                }
            }
            StreamEvent::Signal(signal) => self.signal = Some(signal),
            StreamEvent::Text(text) => self.captured_output.push(text),
        }
    }
}

/// Monitor a spawned worker until it exits or exceeds `timeout`.
///
/// On timeout the child is killed and the stream drained to EOF before the
/// exit status is reaped, so any signal already written is still observed.
/// Timeout takes precedence over crash classification.
#[tracing::instrument(skip(child), fields(timeout_secs = timeout.as_secs()))]
pub async fn monitor_stream(mut child: Child, timeout: Duration) -> Result<AgentSpawnResult> {
    let stdout = child
        .stdout
        .take()
        .context("worker stdout was not piped")?;
    let mut lines = BufReader::new(stdout).lines();

    let mut result = AgentSpawnResult::default();

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        for event in parse_line(&line) {
                            result.apply(event);
                        }
                    }
                    // EOF or a broken pipe both end the stream
                    Ok(None) | Err(_) => break,
                }
            }
            _ = &mut deadline => {
                result.timed_out = true;
                tracing::warn!("worker exceeded timeout, killing");
                let _ = child.start_kill();
                // Drain whatever was flushed before the kill landed
                while let Ok(Some(line)) = lines.next_line().await {
                    for event in parse_line(&line) {
                        result.apply(event);
                    }
                }
                break;
            }
        }
    }

    // The deadline stays armed past EOF: a worker that closes its stdout but
    // keeps running must still be killed when the timeout fires.
    let status = if result.timed_out {
        child.wait().await.context("failed to reap worker process")?
    } else {
        tokio::select! {
            status = child.wait() => status.context("failed to reap worker process")?,
            _ = &mut deadline => {
                result.timed_out = true;
                tracing::warn!("worker exceeded timeout after closing stdout, killing");
                let _ = child.start_kill();
                child.wait().await.context("failed to reap worker process")?
            }
        }
    };
    result.exit_code = status.code();
    result.crashed = !result.timed_out && matches!(result.exit_code, Some(code) if code != 0);

    tracing::debug!(
        session = ?result.session_id,
        exit = ?result.exit_code,
        crashed = result.crashed,
        timed_out = result.timed_out,
        "worker finished"
    );
    Ok(result)
}
