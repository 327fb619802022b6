//! # Pipeline Coordinator
//!
//! Drives a quest through the fixed phase order (build, verify, audit,
//! review) and announces every transition through the phase callback. The
//! quest file is re-read at each phase boundary so worker updates between
//! phases are observed.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::agent::spawner::AgentRunner;
use crate::agent::work_unit::WorkUnit;
use crate::config::EngineConfig;
use crate::quest;

use super::layer::{run_phase, PhaseReport};
use super::phase::OrchestrationPhase;
use super::verify::{run_verification_gate, CheckRunner};

/// What the full pipeline accomplished
#[derive(Debug, Default)]
pub struct PipelineSummary {
    pub build: PhaseReport,
    pub audit: PhaseReport,
    pub review: PhaseReport,
}

/// The pipeline coordinator
pub struct PipelineCoordinator<R, C, F>
where
    R: AgentRunner + ?Sized + 'static,
    C: CheckRunner + ?Sized,
    F: FnMut(OrchestrationPhase),
{
    config: EngineConfig,
    runner: Arc<R>,
    checks: Arc<C>,
    on_phase: F,
}

impl<R, C, F> PipelineCoordinator<R, C, F>
where
    R: AgentRunner + ?Sized + 'static,
    C: CheckRunner + ?Sized,
    F: FnMut(OrchestrationPhase),
{
    pub fn new(config: EngineConfig, runner: Arc<R>, checks: Arc<C>, on_phase: F) -> Self {
        Self {
            config,
            runner,
            checks,
            on_phase,
        }
    }

    /// Run the pipeline for the quest at `quest_path`.
    ///
    /// Announces `Complete` or `Failed` last; a hard failure is also
    /// returned as the error.
    #[tracing::instrument(skip(self), fields(quest_path = %quest_path.display()))]
    pub async fn run(&mut self, quest_path: &Path) -> Result<PipelineSummary> {
        match self.run_phases(quest_path).await {
            Ok(summary) => {
                (self.on_phase)(OrchestrationPhase::Complete);
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "pipeline failed");
                (self.on_phase)(OrchestrationPhase::Failed);
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self, quest_path: &Path) -> Result<PipelineSummary> {
        let window = self.config.max_concurrent;
        let mut summary = PipelineSummary::default();

        // Build: one unit per ready step
        (self.on_phase)(OrchestrationPhase::Build);
        let quest = quest::load(quest_path).await?;
        let units: Vec<WorkUnit> = quest
            .ready_steps()
            .into_iter()
            .map(|step| WorkUnit::for_step(&quest, step))
            .collect();
        summary.build = run_phase(OrchestrationPhase::Build, &self.runner, units, window).await;

        // Verify: external checks gate everything downstream
        (self.on_phase)(OrchestrationPhase::Verify);
        let quest = quest::load(quest_path).await?;
        let check_command = self.config.check_command.join(" ");
        run_verification_gate(
            &self.runner,
            self.checks.as_ref(),
            &quest,
            window,
            &check_command,
        )
        .await?;

        // Audit: one unit per observable
        (self.on_phase)(OrchestrationPhase::Audit);
        let quest = quest::load(quest_path).await?;
        let units: Vec<WorkUnit> = quest
            .observables
            .iter()
            .map(|obs| WorkUnit::for_observable(&quest, obs))
            .collect();
        summary.audit = run_phase(OrchestrationPhase::Audit, &self.runner, units, window).await;

        // Review: one unit per completed step that touched files
        (self.on_phase)(OrchestrationPhase::Review);
        let quest = quest::load(quest_path).await?;
        let units: Vec<WorkUnit> = quest
            .completed_steps()
            .into_iter()
            .filter_map(WorkUnit::for_review)
            .collect();
        summary.review = run_phase(OrchestrationPhase::Review, &self.runner, units, window).await;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::monitor::AgentSpawnResult;
    use crate::agent::stream::StreamSignal;
    use crate::agent::work_unit::{UnitDispatch, WorkRole};
    use crate::pipeline::verify::CheckOutcome;
    use async_trait::async_trait;
    use std::io::Write as _;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const QUEST: &str = r#"{
        "id": "quest-1",
        "folder": "001-profile",
        "title": "Profile",
        "status": "in_progress",
        "createdAt": "2026-08-01T12:00:00Z",
        "contexts": [{"id": "ctx1", "name": "Form", "description": "the form"}],
        "observables": [
            {"id": "o1", "contextId": "ctx1", "trigger": "save clicked"},
            {"id": "o2", "contextId": "ctx1", "trigger": "validation fails"}
        ],
        "steps": [
            {"id": "s1", "name": "endpoint", "status": "pending",
             "filesToCreate": ["src/profile.ts"]},
            {"id": "s2", "name": "wiring", "status": "complete",
             "filesToModify": ["src/routes.ts"]}
        ]
    }"#;

    /// Completes every unit, recording the roles it saw
    #[derive(Default)]
    struct CompletingRunner {
        roles: Mutex<Vec<WorkRole>>,
    }

    #[async_trait]
    impl AgentRunner for CompletingRunner {
        async fn run(&self, dispatch: &UnitDispatch) -> AgentSpawnResult {
            self.roles.lock().unwrap().push(dispatch.unit.role());
            AgentSpawnResult {
                signal: Some(StreamSignal::Complete {
                    step_id: "s".to_string(),
                    summary: None,
                }),
                exit_code: Some(0),
                ..AgentSpawnResult::default()
            }
        }
    }

    struct PassingChecks;

    #[async_trait]
    impl CheckRunner for PassingChecks {
        async fn run_checks(&self) -> Result<CheckOutcome> {
            Ok(CheckOutcome {
                passed: true,
                output: String::new(),
            })
        }
    }

    /// Fails its first run with an extractable report, then passes
    struct FailOnceChecks {
        runs: AtomicU32,
    }

    #[async_trait]
    impl CheckRunner for FailOnceChecks {
        async fn run_checks(&self) -> Result<CheckOutcome> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(CheckOutcome {
                passed: run > 0,
                output: r#"{"checks":[{"projectResults":[{"errors":[{"filePath":"/repo/src/profile.ts"}]}]}]}"#
                    .to_string(),
            })
        }
    }

    struct FailingChecks {
        runs: AtomicU32,
    }

    #[async_trait]
    impl CheckRunner for FailingChecks {
        async fn run_checks(&self) -> Result<CheckOutcome> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(CheckOutcome {
                passed: false,
                output: "no report".to_string(),
            })
        }
    }

    fn quest_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(QUEST.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_happy_path_phase_sequence() {
        let file = quest_file();
        let runner = Arc::new(CompletingRunner::default());
        let checks = Arc::new(PassingChecks);
        let phases = Arc::new(Mutex::new(Vec::new()));

        let phases_cb = Arc::clone(&phases);
        let mut coordinator =
            PipelineCoordinator::new(EngineConfig::default(), Arc::clone(&runner), checks, {
                move |phase| phases_cb.lock().unwrap().push(phase)
            });
        coordinator.run(file.path()).await.unwrap();

        assert_eq!(
            *phases.lock().unwrap(),
            vec![
                OrchestrationPhase::Build,
                OrchestrationPhase::Verify,
                OrchestrationPhase::Audit,
                OrchestrationPhase::Review,
                OrchestrationPhase::Complete,
            ]
        );

        // one ready step, two observables, one reviewable completed step
        let roles = runner.roles.lock().unwrap();
        assert_eq!(
            *roles,
            vec![
                WorkRole::Build,
                WorkRole::Audit,
                WorkRole::Audit,
                WorkRole::Review
            ]
        );
    }

    #[tokio::test]
    async fn test_check_failure_recovered_by_fixer_completes_normally() {
        let file = quest_file();
        let runner = Arc::new(CompletingRunner::default());
        let checks = Arc::new(FailOnceChecks {
            runs: AtomicU32::new(0),
        });
        let phases = Arc::new(Mutex::new(Vec::new()));

        let phases_cb = Arc::clone(&phases);
        let mut coordinator = PipelineCoordinator::new(
            EngineConfig::default(),
            Arc::clone(&runner),
            Arc::clone(&checks),
            move |phase| phases_cb.lock().unwrap().push(phase),
        );
        coordinator.run(file.path()).await.unwrap();

        // the gate's internal fix round never surfaces as a phase transition
        assert_eq!(
            *phases.lock().unwrap(),
            vec![
                OrchestrationPhase::Build,
                OrchestrationPhase::Verify,
                OrchestrationPhase::Audit,
                OrchestrationPhase::Review,
                OrchestrationPhase::Complete,
            ]
        );
        assert_eq!(checks.runs.load(Ordering::SeqCst), 2);

        let roles = runner.roles.lock().unwrap();
        assert_eq!(
            *roles,
            vec![
                WorkRole::Build,
                WorkRole::Fix,
                WorkRole::Audit,
                WorkRole::Audit,
                WorkRole::Review
            ]
        );
    }

    #[tokio::test]
    async fn test_verification_failure_ends_with_failed() {
        let file = quest_file();
        let runner = Arc::new(CompletingRunner::default());
        let checks = Arc::new(FailingChecks {
            runs: AtomicU32::new(0),
        });
        let phases = Arc::new(Mutex::new(Vec::new()));

        let phases_cb = Arc::clone(&phases);
        let mut coordinator = PipelineCoordinator::new(
            EngineConfig::default(),
            Arc::clone(&runner),
            Arc::clone(&checks),
            move |phase| phases_cb.lock().unwrap().push(phase),
        );
        let err = coordinator.run(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("failed after 3 retries"));

        assert_eq!(
            *phases.lock().unwrap(),
            vec![
                OrchestrationPhase::Build,
                OrchestrationPhase::Verify,
                OrchestrationPhase::Failed,
            ]
        );
        assert_eq!(checks.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_quest_fails_immediately() {
        let runner = Arc::new(CompletingRunner::default());
        let checks = Arc::new(PassingChecks);
        let phases = Arc::new(Mutex::new(Vec::new()));

        let phases_cb = Arc::clone(&phases);
        let mut coordinator =
            PipelineCoordinator::new(EngineConfig::default(), runner, checks, move |phase| {
                phases_cb.lock().unwrap().push(phase)
            });
        let err = coordinator
            .run(Path::new("/nonexistent/quest.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read quest file"));

        assert_eq!(
            *phases.lock().unwrap(),
            vec![OrchestrationPhase::Build, OrchestrationPhase::Failed]
        );
    }

    #[tokio::test]
    async fn test_empty_quest_announces_every_phase_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"id": "q", "folder": "f", "title": "t", "status": "in_progress",
                 "createdAt": "2026-08-01T12:00:00Z"}"#,
        )
        .unwrap();

        let runner = Arc::new(CompletingRunner::default());
        let checks = Arc::new(PassingChecks);
        let phases = Arc::new(Mutex::new(Vec::new()));

        let phases_cb = Arc::clone(&phases);
        let mut coordinator =
            PipelineCoordinator::new(EngineConfig::default(), Arc::clone(&runner), checks, {
                move |phase| phases_cb.lock().unwrap().push(phase)
            });
        coordinator.run(file.path()).await.unwrap();

        assert_eq!(phases.lock().unwrap().len(), 5);
        assert!(runner.roles.lock().unwrap().is_empty());
    }
}
