//! # Questforge Core
//!
//! The agent execution and orchestration engine - spawns role-prompted worker
//! agents as child processes, supervises their stdout stream protocol, and
//! drives a quest through a fixed phase pipeline.
//!
//! ## Architecture
//!
//! - `quest/` - Quest data model and loader (read-only task definition)
//! - `agent/` - Stream protocol, process monitor, role spawner, parallel runner
//! - `pipeline/` - Phase layers, verification gate, and the coordinator
//! - `config` - Engine configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use questforge_core::config::EngineConfig;
//! use questforge_core::pipeline::PipelineCoordinator;
//!
//! let config = EngineConfig::default();
//! let mut coordinator = PipelineCoordinator::new(config, runner, checks, |phase| {
//!     println!("phase: {phase}");
//! });
//! coordinator.run(Path::new("quest.json")).await?;
//! ```

pub mod agent;
pub mod config;
pub mod pipeline;
pub mod quest;

pub use agent::monitor::AgentSpawnResult;
pub use agent::spawner::AgentRunner;
pub use agent::stream::StreamSignal;
pub use agent::work_unit::{UnitDispatch, WorkRole, WorkUnit};
pub use config::EngineConfig;
pub use pipeline::coordinator::PipelineCoordinator;
pub use pipeline::phase::OrchestrationPhase;
pub use quest::Quest;
