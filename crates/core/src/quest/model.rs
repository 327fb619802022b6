//! Quest data model.
//!
//! Mirrors the on-disk quest JSON (camelCase fields). Only the parts the
//! engine reads are modeled; unknown fields are ignored on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A quest: the unit of work the pipeline runs end to end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub folder: String,
    pub title: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub observables: Vec<Observable>,
    #[serde(default)]
    pub steps: Vec<QuestStep>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

/// A user-facing requirement an observable can trace back to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// An execution context (a place in the system where behavior is observed)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

/// An observable behavior: trigger plus expected outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observable {
    pub id: String,
    pub context_id: String,
    pub trigger: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
}

/// Expected outcome of an observable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Lifecycle status of a quest step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    Failed,
    Skipped,
}

/// An implementation step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStep {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub observables_satisfied: Vec<String>,
    #[serde(default)]
    pub files_to_create: Vec<String>,
    #[serde(default)]
    pub files_to_modify: Vec<String>,
    #[serde(default)]
    pub input_contracts: Vec<String>,
    #[serde(default)]
    pub output_contracts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
}

/// A named interface contract shared between steps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub properties: Vec<ContractProperty>,
}

/// One property of a contract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractProperty {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Quest {
    /// Steps whose dependencies are all complete and which have not run yet
    pub fn ready_steps(&self) -> Vec<&QuestStep> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Pending)
            .filter(|step| {
                step.depends_on.iter().all(|dep| {
                    self.steps
                        .iter()
                        .any(|s| s.id == *dep && s.status == StepStatus::Complete)
                })
            })
            .collect()
    }

    /// Steps that have finished implementation
    pub fn completed_steps(&self) -> Vec<&QuestStep> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Complete)
            .collect()
    }
}

impl QuestStep {
    /// Files this step touches, created first, deduplicated in order
    pub fn touched_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        for path in self.files_to_create.iter().chain(&self.files_to_modify) {
            if !files.contains(path) {
                files.push(path.clone());
            }
        }
        files
    }
}
