//! Simulated test execution used to gate the review hand-off.
//!
//! The run is cosmetic: it completes after a fixed wall-clock delay, not in
//! response to any real backend job. Completion is sticky per survey so the
//! "proceed to review" control stays enabled once a run has finished.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

/// Fixed length of a simulated run.
pub const RUN_DURATION: Duration = Duration::from_secs(8);

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestRunState {
    #[default]
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone, Default)]
struct RunEntry {
    state: TestRunState,
    generation: u64,
    completed_once: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct TestRunStatus {
    pub state: TestRunState,
    pub can_proceed: bool,
}

/// Drives the fake per-survey test run. There is no cancellation: once
/// started, the timer always completes. Starting while a run is in flight is
/// coalesced into the existing run, and a completion superseded by a newer
/// start is discarded via the generation counter.
#[derive(Clone)]
pub struct TestRunService {
    runs: Arc<DashMap<Uuid, RunEntry>>,
    run_duration: Duration,
}

impl Default for TestRunService {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunService {
    pub fn new() -> Self {
        Self::with_duration(RUN_DURATION)
    }

    pub fn with_duration(run_duration: Duration) -> Self {
        Self {
            runs: Arc::new(DashMap::new()),
            run_duration,
        }
    }

    /// Transition Idle (or Completed) to Running and arm the timer.
    pub fn start(&self, survey_id: Uuid) -> TestRunStatus {
        let (generation, status) = {
            let mut entry = self.runs.entry(survey_id).or_default();
            if entry.state == TestRunState::Running {
                debug!(survey_id = %survey_id, "test run already in flight, coalesced");
                return TestRunStatus {
                    state: entry.state.clone(),
                    can_proceed: entry.completed_once,
                };
            }
            entry.state = TestRunState::Running;
            entry.generation += 1;
            (
                entry.generation,
                TestRunStatus {
                    state: TestRunState::Running,
                    can_proceed: entry.completed_once,
                },
            )
        };

        info!(survey_id = %survey_id, "test run started");

        let runs = Arc::clone(&self.runs);
        let run_duration = self.run_duration;
        tokio::spawn(async move {
            tokio::time::sleep(run_duration).await;
            if let Some(mut entry) = runs.get_mut(&survey_id) {
                if entry.generation != generation {
                    // Superseded by a newer run; drop the stale completion.
                    return;
                }
                entry.state = TestRunState::Completed;
                entry.completed_once = true;
                info!(survey_id = %survey_id, "test run completed");
            }
        });

        status
    }

    pub fn status(&self, survey_id: Uuid) -> TestRunStatus {
        self.runs
            .get(&survey_id)
            .map(|entry| TestRunStatus {
                state: entry.state.clone(),
                can_proceed: entry.completed_once,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_transitions_idle_running_completed_exactly_once() {
        let service = TestRunService::with_duration(Duration::from_millis(100));
        let survey_id = Uuid::new_v4();

        assert_eq!(service.status(survey_id).state, TestRunState::Idle);
        assert!(!service.status(survey_id).can_proceed);

        let started = service.start(survey_id);
        assert_eq!(started.state, TestRunState::Running);
        // Proceed stays gated for the whole run.
        assert!(!started.can_proceed);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.status(survey_id).state, TestRunState::Running);
        assert!(!service.status(survey_id).can_proceed);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let done = service.status(survey_id);
        assert_eq!(done.state, TestRunState::Completed);
        assert!(done.can_proceed);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_while_running_is_coalesced() {
        let service = TestRunService::with_duration(Duration::from_millis(100));
        let survey_id = Uuid::new_v4();

        service.start(survey_id);
        let again = service.start(survey_id);
        assert_eq!(again.state, TestRunState::Running);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(service.status(survey_id).state, TestRunState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_gate_is_sticky_across_reruns() {
        let service = TestRunService::with_duration(Duration::from_millis(100));
        let survey_id = Uuid::new_v4();

        service.start(survey_id);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(service.status(survey_id).can_proceed);

        // A re-run goes back to Running but keeps the gate open.
        let rerun = service.start(survey_id);
        assert_eq!(rerun.state, TestRunState::Running);
        assert!(rerun.can_proceed);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(service.status(survey_id).state, TestRunState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn surveys_track_runs_independently() {
        let service = TestRunService::with_duration(Duration::from_millis(100));
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        service.start(first);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(service.status(first).state, TestRunState::Completed);
        assert_eq!(service.status(second).state, TestRunState::Idle);
        assert!(!service.status(second).can_proceed);
    }
}
