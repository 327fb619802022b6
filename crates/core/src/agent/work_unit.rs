//! Work units: the typed payload handed to a worker agent.
//!
//! Each unit is role-tagged and carries exactly the slice of the quest its
//! role needs. Units also know how to render themselves into the argument
//! block substituted into the role's prompt template.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quest::{Context, Contract, Observable, Quest, QuestStep, Requirement};

use super::stream::StreamSignal;

/// Worker agent role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkRole {
    /// Implements quest steps
    Build,
    /// Writes tests against observables
    Audit,
    /// Reviews finished files
    Review,
    /// Repairs check failures
    Fix,
    /// Explores the quest to refine it
    Discover,
}

impl WorkRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkRole::Build => "build",
            WorkRole::Audit => "audit",
            WorkRole::Review => "review",
            WorkRole::Fix => "fix",
            WorkRole::Discover => "discover",
        }
    }
}

impl fmt::Display for WorkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work for one worker agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WorkUnit {
    Discover {
        quest_id: String,
    },
    Build {
        quest_id: String,
        step: QuestStep,
        related_contracts: Vec<Contract>,
        related_observables: Vec<Observable>,
        related_requirements: Vec<Requirement>,
    },
    Audit {
        quest_id: String,
        observables: Vec<Observable>,
        contexts: Vec<Context>,
    },
    Review {
        file_paths: Vec<String>,
    },
    Fix {
        file_paths: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        errors: Option<Vec<String>>,
        /// Check command the fixer is told to re-run
        check_command: String,
    },
    /// Built from a needs-role-followup signal; routed to the target role
    Followup {
        step_id: String,
        target_role: WorkRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
}

impl WorkUnit {
    /// Role this unit is routed to
    pub fn role(&self) -> WorkRole {
        match self {
            WorkUnit::Discover { .. } => WorkRole::Discover,
            WorkUnit::Build { .. } => WorkRole::Build,
            WorkUnit::Audit { .. } => WorkRole::Audit,
            WorkUnit::Review { .. } => WorkRole::Review,
            WorkUnit::Fix { .. } => WorkRole::Fix,
            WorkUnit::Followup { target_role, .. } => *target_role,
        }
    }

    /// Build unit for one step, with contract/observable/requirement slices
    /// cross-referenced from the quest
    pub fn for_step(quest: &Quest, step: &QuestStep) -> Self {
        let related_contracts: Vec<Contract> = quest
            .contracts
            .iter()
            .filter(|c| {
                step.input_contracts.contains(&c.name) || step.output_contracts.contains(&c.name)
            })
            .cloned()
            .collect();

        let related_observables: Vec<Observable> = quest
            .observables
            .iter()
            .filter(|o| step.observables_satisfied.contains(&o.id))
            .cloned()
            .collect();

        let related_requirements: Vec<Requirement> = quest
            .requirements
            .iter()
            .filter(|r| {
                related_observables
                    .iter()
                    .any(|o| o.requirement_id.as_deref() == Some(r.id.as_str()))
            })
            .cloned()
            .collect();

        WorkUnit::Build {
            quest_id: quest.id.clone(),
            step: step.clone(),
            related_contracts,
            related_observables,
            related_requirements,
        }
    }

    /// Audit unit for one observable, with its context attached
    pub fn for_observable(quest: &Quest, observable: &Observable) -> Self {
        let contexts: Vec<Context> = quest
            .contexts
            .iter()
            .filter(|c| c.id == observable.context_id)
            .cloned()
            .collect();

        WorkUnit::Audit {
            quest_id: quest.id.clone(),
            observables: vec![observable.clone()],
            contexts,
        }
    }

    /// Review unit for one completed step; None when the step touches no files
    pub fn for_review(step: &QuestStep) -> Option<Self> {
        let file_paths = step.touched_files();
        if file_paths.is_empty() {
            return None;
        }
        Some(WorkUnit::Review { file_paths })
    }

    /// Fix unit over the given files with accumulated error text
    pub fn for_fix(
        file_paths: Vec<String>,
        errors: Option<Vec<String>>,
        check_command: &str,
    ) -> Self {
        WorkUnit::Fix {
            file_paths,
            errors,
            check_command: check_command.to_string(),
        }
    }

    /// Follow-up unit derived from a worker's needs-role-followup signal.
    ///
    /// Reason and context collapse into one free-text block for the target.
    pub fn from_followup_signal(signal: &StreamSignal) -> Option<Self> {
        let StreamSignal::NeedsRoleFollowup {
            step_id,
            target_role,
            reason,
            context,
            ..
        } = signal
        else {
            return None;
        };

        let context = match (reason, context) {
            (Some(r), Some(c)) => Some(format!("{r}\n{c}")),
            (Some(r), None) => Some(r.clone()),
            (None, Some(c)) => Some(c.clone()),
            (None, None) => None,
        };

        Some(WorkUnit::Followup {
            step_id: step_id.clone(),
            target_role: *target_role,
            context,
        })
    }

    /// Render the argument block substituted into the role prompt template
    pub fn render_arguments(&self) -> String {
        let mut out = String::new();
        match self {
            WorkUnit::Discover { quest_id } => {
                push_line(&mut out, &format!("Quest ID: {quest_id}"));
            }
            WorkUnit::Build {
                quest_id,
                step,
                related_contracts,
                related_observables,
                related_requirements,
            } => {
                push_line(&mut out, &format!("Step: {}", step.name));
                push_line(&mut out, &format!("Description: {}", step.description));
                if let Some(export) = &step.export_name {
                    push_line(&mut out, &format!("Export Name: {export}"));
                }
                push_bullets(&mut out, "Files to Create:", &step.files_to_create);
                push_bullets(&mut out, "Files to Modify:", &step.files_to_modify);
                if !related_contracts.is_empty() {
                    push_line(&mut out, "Related Contracts:");
                    for contract in related_contracts {
                        push_line(&mut out, &format!("  - {} ({})", contract.name, contract.kind));
                        for prop in &contract.properties {
                            let kind = prop.kind.as_deref().unwrap_or("unknown");
                            let desc = prop.description.as_deref().unwrap_or("");
                            push_line(&mut out, &format!("    - {} ({kind}) - {desc}", prop.name));
                        }
                    }
                }
                if !related_observables.is_empty() {
                    push_line(&mut out, "Related Observables:");
                    for obs in related_observables {
                        render_build_observable(&mut out, obs);
                    }
                }
                if !related_requirements.is_empty() {
                    push_line(&mut out, "Related Requirements:");
                    for req in related_requirements {
                        push_line(&mut out, &format!("  - {}: {}", req.name, req.description));
                    }
                }
                push_line(&mut out, &format!("Quest ID: {quest_id}"));
            }
            WorkUnit::Audit {
                quest_id,
                observables,
                contexts,
            } => {
                push_line(&mut out, &format!("Quest ID: {quest_id}"));
                if !observables.is_empty() {
                    push_line(&mut out, "Observables:");
                    for obs in observables {
                        render_audit_observable(&mut out, obs);
                    }
                }
                if !contexts.is_empty() {
                    push_line(&mut out, "Contexts:");
                    for ctx in contexts {
                        push_line(&mut out, &format!("  - {}: {}", ctx.name, ctx.description));
                    }
                }
            }
            WorkUnit::Review { file_paths } => {
                push_bullets(&mut out, "Files to Review:", file_paths);
            }
            WorkUnit::Fix {
                file_paths,
                errors,
                check_command,
            } => {
                push_bullets(&mut out, "Files:", file_paths);
                if let Some(errors) = errors {
                    push_bullets(&mut out, "Errors:", errors);
                }
                push_line(
                    &mut out,
                    &format!("After fixing, run `{check_command}` and confirm it passes."),
                );
            }
            WorkUnit::Followup {
                step_id, context, ..
            } => {
                push_line(&mut out, &format!("Step ID: {step_id}"));
                if let Some(context) = context {
                    push_line(&mut out, "");
                    push_line(&mut out, context);
                }
            }
        }
        out.trim_end().to_string()
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    push_line(out, heading);
    for item in items {
        push_line(out, &format!("  - {item}"));
    }
}

// Build units name the trigger explicitly and lead outcomes with their type
fn render_build_observable(out: &mut String, obs: &Observable) {
    push_line(out, &format!("  - Trigger: {}", obs.trigger));
    if let Some(verification) = &obs.verification {
        for step in verification {
            push_line(out, &format!("    Verification: {step}"));
        }
    }
    for outcome in &obs.outcomes {
        push_line(out, &format!("    - {}: {}", outcome.kind, outcome.description));
    }
}

// Audit units carry the context id inline since they span contexts
fn render_audit_observable(out: &mut String, obs: &Observable) {
    push_line(out, &format!("  - [{}] {}", obs.context_id, obs.trigger));
    if let Some(verification) = &obs.verification {
        for step in verification {
            push_line(out, &format!("    Verification: {step}"));
        }
    }
    for outcome in &obs.outcomes {
        push_line(out, &format!("    - {} ({})", outcome.description, outcome.kind));
    }
}

/// A unit plus its dispatch context: session resumption and the continuation
/// point carried over from a partially-complete attempt
#[derive(Debug, Clone)]
pub struct UnitDispatch {
    pub unit: WorkUnit,
    pub resume_session: Option<String>,
    pub continuation: Option<String>,
}

impl UnitDispatch {
    pub fn new(unit: WorkUnit) -> Self {
        Self {
            unit,
            resume_session: None,
            continuation: None,
        }
    }

    pub fn resumed(unit: WorkUnit, session: Option<String>, continuation: Option<String>) -> Self {
        Self {
            unit,
            resume_session: session,
            continuation,
        }
    }
}
