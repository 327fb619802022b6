//! # Engine Configuration
//!
//! Knobs for the orchestration engine: concurrency window, per-unit timeout,
//! and the external commands for worker agents and verification checks.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the orchestration engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum worker agents running at once (window size, default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Per-unit wall-clock timeout in seconds (default: 600)
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
    /// Worker agent program (default: "claude")
    #[serde(default = "default_agent_program")]
    pub agent_program: String,
    /// Leading arguments passed to the worker agent before the prompt
    #[serde(default = "default_agent_args")]
    pub agent_args: Vec<String>,
    /// Verification check command, program first (default: "questforge-check run all-checks")
    #[serde(default = "default_check_command")]
    pub check_command: Vec<String>,
    /// Working directory for worker and check processes (default: inherit)
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_unit_timeout_secs() -> u64 {
    600
}

fn default_agent_program() -> String {
    "claude".to_string()
}

fn default_agent_args() -> Vec<String> {
    vec![
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--verbose".to_string(),
    ]
}

fn default_check_command() -> Vec<String> {
    vec![
        "questforge-check".to_string(),
        "run".to_string(),
        "all-checks".to_string(),
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            unit_timeout_secs: default_unit_timeout_secs(),
            agent_program: default_agent_program(),
            agent_args: default_agent_args(),
            check_command: default_check_command(),
            project_root: None,
        }
    }
}

impl EngineConfig {
    /// Per-unit timeout as a `Duration`
    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }
}
