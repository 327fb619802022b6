//! # Orchestration Phases
//!
//! Defines the phases of the quest pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the quest pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationPhase {
    /// Discovery agent refining the quest
    Discover,
    /// Build agents implementing steps
    Build,
    /// External checks gating progress
    Verify,
    /// Audit agents writing tests
    Audit,
    /// Review agents going over finished files
    Review,
    /// Fix agents repairing check failures
    Fix,
    /// Nothing running
    Idle,
    /// Pipeline finished successfully
    Complete,
    /// Pipeline aborted on a hard failure
    Failed,
}

impl OrchestrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationPhase::Discover => "discover",
            OrchestrationPhase::Build => "build",
            OrchestrationPhase::Verify => "verify",
            OrchestrationPhase::Audit => "audit",
            OrchestrationPhase::Review => "review",
            OrchestrationPhase::Fix => "fix",
            OrchestrationPhase::Idle => "idle",
            OrchestrationPhase::Complete => "complete",
            OrchestrationPhase::Failed => "failed",
        }
    }

    /// Terminal phases end the pipeline
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestrationPhase::Complete | OrchestrationPhase::Failed
        )
    }
}

impl fmt::Display for OrchestrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
