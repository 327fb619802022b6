//! # Quest
//!
//! The quest file is the task definition the pipeline executes against. The
//! engine treats it as read-only input: worker agents update it on disk, and
//! the coordinator re-reads it fresh at every phase boundary.

pub mod loader;
pub mod model;

pub use loader::load;
pub use model::{
    Context, Contract, ContractProperty, Observable, Outcome, Quest, QuestStep, Requirement,
    StepStatus,
};
