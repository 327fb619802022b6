//! # Pipeline
//!
//! Drives a quest through the fixed phase order: build, verify, audit,
//! review. Each agent phase runs through the shared retry layer; the verify
//! phase gates on the external check command.

pub mod coordinator;
pub mod layer;
pub mod phase;
pub mod verify;

pub use coordinator::{PipelineCoordinator, PipelineSummary};
pub use layer::{run_phase, PhaseReport};
pub use phase::OrchestrationPhase;
pub use verify::{run_verification_gate, CheckOutcome, CheckRunner, CommandCheckRunner};
