//! Drives the fetch/analyze/report/persist cycle forever.
//!
//! Two states: `Running` (normal cadence) and `RetryWait` (after an empty
//! or rejected fetch, only the fetch is retried). There is no terminal
//! state; shutdown happens by cancelling the future (see `main.rs`).

use crate::analysis;
use crate::config::{AppConfig, SchedulerConfig};
use crate::error::PipelineError;
use crate::excel;
use crate::markets::{MarketSource, RawRecord};
use crate::report;
use log::{error, info, warn};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    RetryWait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleOutcome {
    /// Fetch returned no records.
    Empty,
    /// Analysis, report, and persistence all ran (persistence may have
    /// failed, which is logged but does not change the cadence).
    Completed,
    /// The snapshot failed validation and was abandoned.
    ValidationFailed,
}

impl CycleOutcome {
    pub(crate) fn next_state(self) -> LoopState {
        match self {
            CycleOutcome::Empty | CycleOutcome::ValidationFailed => LoopState::RetryWait,
            CycleOutcome::Completed => LoopState::Running,
        }
    }
}

/// Runs the loop with the production pipeline as the snapshot handler.
pub async fn run<S: MarketSource>(source: S, config: &AppConfig) -> anyhow::Result<()> {
    let vs_currency = config.market.vs_currency.clone();
    let output_path = config.output.path.clone();

    run_with_handler(source, config.scheduler.clone(), move |snapshot| {
        let summary = analysis::analyze(&snapshot)?;
        report::print(&summary, &vs_currency);
        excel::write_snapshot(&snapshot, &output_path)?;
        info!("Spreadsheet {:?} updated successfully", output_path);
        Ok(())
    })
    .await
}

/// The loop itself, generic over the snapshot handler so tests can observe
/// exactly when the pipeline runs.
pub(crate) async fn run_with_handler<S, F>(
    source: S,
    config: SchedulerConfig,
    mut handle_snapshot: F,
) -> anyhow::Result<()>
where
    S: MarketSource,
    F: FnMut(Vec<RawRecord>) -> Result<(), PipelineError>,
{
    let mut state = LoopState::Running;
    loop {
        match state {
            LoopState::RetryWait => {
                info!("Retrying in {} seconds...", config.retry_delay_secs);
                sleep(config.retry_delay()).await;
                state = LoopState::Running;
            }
            LoopState::Running => {
                info!("Fetching live cryptocurrency data...");
                let snapshot = source.fetch_snapshot().await;

                if snapshot.is_empty() {
                    warn!("No data fetched");
                    state = CycleOutcome::Empty.next_state();
                    continue;
                }

                let outcome = match handle_snapshot(snapshot) {
                    Ok(()) => CycleOutcome::Completed,
                    Err(PipelineError::Validation(msg)) => {
                        if config.halt_on_validation_error {
                            return Err(PipelineError::Validation(msg).into());
                        }
                        warn!("Snapshot rejected: {}", msg);
                        CycleOutcome::ValidationFailed
                    }
                    Err(PipelineError::Persistence(msg)) => {
                        // The report was already shown; the cycle counts as
                        // complete.
                        error!("Error updating spreadsheet: {}", msg);
                        CycleOutcome::Completed
                    }
                };

                state = outcome.next_state();
                if state == LoopState::Running {
                    info!(
                        "Waiting {} seconds before next update...",
                        config.interval_secs
                    );
                    sleep(config.interval()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::timeout;

    fn minimal_record() -> RawRecord {
        let mut map = RawRecord::new();
        map.insert("name".to_string(), json!("Bitcoin"));
        map
    }

    struct ScriptedSource {
        responses: Mutex<VecDeque<Vec<RawRecord>>>,
        fetches: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Vec<RawRecord>>, fetches: Arc<AtomicUsize>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                fetches,
            }
        }
    }

    #[async_trait]
    impl MarketSource for ScriptedSource {
        async fn fetch_snapshot(&self) -> Vec<RawRecord> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    fn config(interval_secs: u64, retry_delay_secs: u64, halt: bool) -> SchedulerConfig {
        SchedulerConfig {
            interval_secs,
            retry_delay_secs,
            halt_on_validation_error: halt,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_fetch_skips_pipeline_and_waits_retry_delay() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::new(vec![Vec::new(), vec![minimal_record()]], fetches.clone());

        let handled_in = handled.clone();
        let loop_fut = run_with_handler(source, config(300, 60, false), move |snapshot| {
            assert!(!snapshot.is_empty());
            handled_in.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // t=0 empty fetch, t=60 data fetch + pipeline, next fetch at t=360
        let _ = timeout(Duration::from_secs(100), loop_fut).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_uses_retry_delay() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::new(
            vec![vec![minimal_record()], vec![minimal_record()]],
            fetches.clone(),
        );

        let handled_in = handled.clone();
        let loop_fut = run_with_handler(source, config(300, 60, false), move |_| {
            if handled_in.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PipelineError::Validation("missing field".to_string()))
            } else {
                Ok(())
            }
        });

        // t=0 rejected snapshot, t=60 accepted one, next fetch at t=360
        let _ = timeout(Duration::from_secs(100), loop_fut).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(handled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_keeps_normal_cadence() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::new(
            vec![vec![minimal_record()], vec![minimal_record()]],
            fetches.clone(),
        );

        let handled_in = handled.clone();
        let loop_fut = run_with_handler(source, config(300, 60, false), move |_| {
            if handled_in.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PipelineError::Persistence("disk full".to_string()))
            } else {
                Ok(())
            }
        });

        // A retry-wait cadence would have produced a third fetch by t=400;
        // the normal interval puts the second fetch at t=300.
        let _ = timeout(Duration::from_secs(400), loop_fut).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(handled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_halts_when_policy_says_so() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource::new(vec![vec![minimal_record()]], fetches.clone());

        let loop_fut = run_with_handler(source, config(300, 60, true), move |_| {
            Err(PipelineError::Validation("missing field".to_string()))
        });

        let result = timeout(Duration::from_secs(10), loop_fut).await;
        match result {
            Ok(Err(err)) => assert!(err.to_string().contains("missing field")),
            other => panic!("loop should have halted with an error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn outcome_transitions() {
        assert_eq!(CycleOutcome::Empty.next_state(), LoopState::RetryWait);
        assert_eq!(
            CycleOutcome::ValidationFailed.next_state(),
            LoopState::RetryWait
        );
        assert_eq!(CycleOutcome::Completed.next_state(), LoopState::Running);
    }
}
