//! # Agent
//!
//! Worker agent execution: the stdout stream protocol, the process monitor,
//! prompt templates, the role spawner, and the windowed parallel runner.

pub mod monitor;
pub mod parallel;
pub mod prompts;
pub mod spawner;
pub mod stream;
pub mod work_unit;

pub use monitor::AgentSpawnResult;
pub use parallel::run_in_windows;
pub use spawner::{AgentRunner, ClaudeRunner};
pub use stream::{StreamSignal, SIGNAL_TOOL_NAME};
pub use work_unit::{UnitDispatch, WorkRole, WorkUnit};
