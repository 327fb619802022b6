//! Windowed parallel execution.
//!
//! Units run in fixed windows of at most `window` concurrent workers. The
//! next window starts only after every worker in the current one has
//! settled. Results come back in input order, and a panicked worker task
//! maps to a synthetic crashed result so one failure never poisons a batch.

use std::sync::Arc;

use super::monitor::AgentSpawnResult;
use super::spawner::AgentRunner;
use super::work_unit::UnitDispatch;

/// Run dispatches through `runner`, at most `window` at a time.
///
/// Returns one result per dispatch, in the same order. A `window` of zero is
/// treated as one.
pub async fn run_in_windows<R>(
    runner: &Arc<R>,
    dispatches: Vec<UnitDispatch>,
    window: usize,
) -> Vec<AgentSpawnResult>
where
    R: AgentRunner + ?Sized + 'static,
{
    let window = window.max(1);
    let mut results = Vec::with_capacity(dispatches.len());

    let mut remaining = dispatches.into_iter().peekable();
    while remaining.peek().is_some() {
        let batch: Vec<UnitDispatch> = remaining.by_ref().take(window).collect();

        let mut handles = Vec::with_capacity(batch.len());
        for dispatch in batch {
            let runner = Arc::clone(runner);
            handles.push(tokio::spawn(
                async move { runner.run(&dispatch).await },
            ));
        }

        // Awaiting handles in spawn order is what preserves input order
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(error = %e, "worker task panicked, recording crash");
                    results.push(AgentSpawnResult::spawn_failure());
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::stream::StreamSignal;
    use crate::agent::work_unit::WorkUnit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn discover(id: &str) -> UnitDispatch {
        UnitDispatch::new(WorkUnit::Discover {
            quest_id: id.to_string(),
        })
    }

    fn quest_id(dispatch: &UnitDispatch) -> String {
        match &dispatch.unit {
            WorkUnit::Discover { quest_id } => quest_id.clone(),
            _ => panic!("expected discover unit"),
        }
    }

    /// Completes each unit after a per-unit delay, tracking peak concurrency
    struct TrackingRunner {
        delays_ms: Vec<u64>,
        active: AtomicUsize,
        peak: AtomicUsize,
        panic_on: Option<String>,
    }

    impl TrackingRunner {
        fn new(delays_ms: Vec<u64>) -> Self {
            Self {
                delays_ms,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                panic_on: None,
            }
        }
    }

    #[async_trait]
    impl AgentRunner for TrackingRunner {
        async fn run(&self, dispatch: &UnitDispatch) -> AgentSpawnResult {
            let id = quest_id(dispatch);
            if self.panic_on.as_deref() == Some(id.as_str()) {
                panic!("scripted panic for {id}");
            }

            let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);

            let index: usize = id.trim_start_matches("q").parse().unwrap();
            let delay = self.delays_ms.get(index).copied().unwrap_or(1);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            AgentSpawnResult {
                signal: Some(StreamSignal::Complete {
                    step_id: id,
                    summary: None,
                }),
                exit_code: Some(0),
                ..AgentSpawnResult::default()
            }
        }
    }

    fn dispatches(n: usize) -> Vec<UnitDispatch> {
        (0..n).map(|i| discover(&format!("q{i}"))).collect()
    }

    fn result_ids(results: &[AgentSpawnResult]) -> Vec<String> {
        results
            .iter()
            .map(|r| r.signal.as_ref().unwrap().step_id().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_input_spawns_nothing() {
        let runner = Arc::new(TrackingRunner::new(Vec::new()));
        let results = run_in_windows(&runner, Vec::new(), 3).await;
        assert!(results.is_empty());
        assert_eq!(runner.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_preserve_input_order() {
        // first unit is the slowest in its window
        let runner = Arc::new(TrackingRunner::new(vec![80, 10, 10, 10]));
        let results = run_in_windows(&runner, dispatches(4), 2).await;
        assert_eq!(result_ids(&results), vec!["q0", "q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_window() {
        let runner = Arc::new(TrackingRunner::new(vec![30; 7]));
        let results = run_in_windows(&runner, dispatches(7), 3).await;
        assert_eq!(results.len(), 7);
        assert!(runner.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_window_of_zero_runs_serially() {
        let runner = Arc::new(TrackingRunner::new(vec![5; 3]));
        let results = run_in_windows(&runner, dispatches(3), 0).await;
        assert_eq!(results.len(), 3);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicked_worker_becomes_crashed_result() {
        let mut runner = TrackingRunner::new(vec![5; 3]);
        runner.panic_on = Some("q1".to_string());
        let runner = Arc::new(runner);

        let results = run_in_windows(&runner, dispatches(3), 3).await;
        assert_eq!(results.len(), 3);
        assert!(!results[0].crashed);
        assert!(results[1].crashed);
        assert!(results[1].signal.is_none());
        assert!(!results[2].crashed);
    }
}
