//! Shared phase-layer driver.
//!
//! Every agent phase (build, audit, review) follows the same pattern: run
//! the derived units through the windowed runner, keep the ones whose worker
//! signaled `complete`, and retry the rest a bounded number of times. Units
//! still unsatisfied after the last retry are dropped, never escalated: a
//! failing worker must not abort the phase.

use std::sync::Arc;

use crate::agent::monitor::AgentSpawnResult;
use crate::agent::parallel::run_in_windows;
use crate::agent::spawner::AgentRunner;
use crate::agent::stream::StreamSignal;
use crate::agent::work_unit::{UnitDispatch, WorkUnit};

use super::phase::OrchestrationPhase;

/// Retries after the initial attempt
pub const MAX_PHASE_RETRIES: u32 = 2;

/// Fire-and-forget follow-up dispatches allowed per phase
pub const MAX_FOLLOWUP_DISPATCHES: u32 = 3;

/// What a phase accomplished
#[derive(Debug, Default)]
pub struct PhaseReport {
    /// Step ids whose workers signaled `complete`
    pub satisfied: Vec<String>,
    /// Units still unsatisfied after the last retry
    pub dropped: usize,
    /// Follow-up workers dispatched (results intentionally unobserved)
    pub followups_dispatched: u32,
}

/// Run one agent phase to completion.
///
/// A unit is satisfied only by an exact `complete` signal. Partial completion
/// re-queues the unit with its session and continuation point. A
/// needs-role-followup signal dispatches the requested role without awaiting
/// it (budgeted), and re-queues the signaling unit, resuming its session when
/// the signal asked for it. Crashes, timeouts, and silence simply re-queue.
#[tracing::instrument(skip(runner, units), fields(phase = %phase, units = units.len()))]
pub async fn run_phase<R>(
    phase: OrchestrationPhase,
    runner: &Arc<R>,
    units: Vec<WorkUnit>,
    window: usize,
) -> PhaseReport
where
    R: AgentRunner + ?Sized + 'static,
{
    let mut report = PhaseReport::default();
    let mut followup_budget = MAX_FOLLOWUP_DISPATCHES;

    let mut pending: Vec<UnitDispatch> = units.into_iter().map(UnitDispatch::new).collect();

    let mut attempt = 0;
    while !pending.is_empty() && attempt <= MAX_PHASE_RETRIES {
        let batch = std::mem::take(&mut pending);
        let units: Vec<WorkUnit> = batch.iter().map(|d| d.unit.clone()).collect();
        let results = run_in_windows(runner, batch, window).await;

        for (unit, result) in units.into_iter().zip(results) {
            match classify(&result) {
                Disposition::Satisfied(step_id) => report.satisfied.push(step_id),
                Disposition::Resume {
                    continuation,
                } => {
                    pending.push(UnitDispatch::resumed(
                        unit,
                        result.session_id.clone(),
                        continuation,
                    ));
                }
                Disposition::Followup { resume } => {
                    if let Some(signal) = &result.signal {
                        if let Some(followup) = WorkUnit::from_followup_signal(signal) {
                            if followup_budget > 0 {
                                followup_budget -= 1;
                                report.followups_dispatched += 1;
                                dispatch_followup(runner, followup);
                            } else {
                                tracing::warn!(phase = %phase, "follow-up budget exhausted, skipping dispatch");
                            }
                        }
                    }
                    let session = if resume { result.session_id.clone() } else { None };
                    pending.push(UnitDispatch::resumed(unit, session, None));
                }
                Disposition::Retry => pending.push(UnitDispatch::new(unit)),
            }
        }

        attempt += 1;
    }

    report.dropped = pending.len();
    if report.dropped > 0 {
        tracing::warn!(
            phase = %phase,
            dropped = report.dropped,
            "units still unsatisfied after {} retries, dropping",
            MAX_PHASE_RETRIES
        );
    }
    report
}

enum Disposition {
    Satisfied(String),
    Resume { continuation: Option<String> },
    Followup { resume: bool },
    Retry,
}

fn classify(result: &AgentSpawnResult) -> Disposition {
    match &result.signal {
        Some(StreamSignal::Complete { step_id, .. }) => Disposition::Satisfied(step_id.clone()),
        Some(StreamSignal::PartiallyComplete {
            continuation_point, ..
        }) => Disposition::Resume {
            continuation: continuation_point.clone(),
        },
        Some(StreamSignal::NeedsRoleFollowup { resume, .. }) => Disposition::Followup {
            resume: resume.unwrap_or(false),
        },
        None => Disposition::Retry,
    }
}

/// Dispatch a follow-up worker without awaiting it.
///
/// The signaling unit's next attempt is what observes whether the follow-up
/// helped; the follow-up's own result is dropped.
fn dispatch_followup<R>(runner: &Arc<R>, unit: WorkUnit)
where
    R: AgentRunner + ?Sized + 'static,
{
    tracing::info!(role = %unit.role(), "dispatching follow-up worker");
    let runner = Arc::clone(runner);
    tokio::spawn(async move {
        let _ = runner.run(&UnitDispatch::new(unit)).await;
    });
}
