use std::time::Duration;

use crate::api::base::AssistantsApi;
use crate::api::types::{Run, RunStatus};
use crate::clock::Clock;
use crate::config::PollingSettings;
use crate::errors::ApiResult;

/// Where the driver is in the life of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Waiting on the remote side; poll again after one interval.
    Polling,
    /// The run is blocked on tool outputs from us.
    AwaitingToolOutputs,
    Completed,
    Failed(RunStatus),
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// A status read back from the service.
    Observed(RunStatus),
    ToolOutputsSubmitted,
}

/// Terminal phases absorb every further event.
pub fn next_phase(phase: RunPhase, event: PollEvent) -> RunPhase {
    if phase.is_terminal() {
        return phase;
    }
    match event {
        PollEvent::ToolOutputsSubmitted => RunPhase::Polling,
        PollEvent::Observed(status) => match status {
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => RunPhase::Polling,
            RunStatus::RequiresAction => RunPhase::AwaitingToolOutputs,
            RunStatus::Completed => RunPhase::Completed,
            RunStatus::Cancelled
            | RunStatus::Failed
            | RunStatus::Expired
            | RunStatus::Incomplete => RunPhase::Failed(status),
        },
    }
}

/// What a thread's run list says about outstanding work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backlog {
    Clear,
    Active(RunStatus),
    ActionPending(String),
}

/// A run waiting on tool outputs wins over runs that are merely executing.
pub fn backlog(runs: &[Run]) -> Backlog {
    if let Some(run) = runs.iter().find(|r| r.status == RunStatus::RequiresAction) {
        return Backlog::ActionPending(run.id.clone());
    }
    match runs.iter().find(|r| r.status.is_active()) {
        Some(run) => Backlog::Active(run.status),
        None => Backlog::Clear,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPolicy {
    pub interval: Duration,
    pub ceiling: Duration,
}

impl Default for DrainPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            ceiling: Duration::from_secs(60),
        }
    }
}

impl From<&PollingSettings> for DrainPolicy {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval(),
            ceiling: settings.drain_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// No queued or in-progress runs remain.
    Idle,
    /// A run needs tool outputs; the caller should go handle it.
    ActionPending { run_id: String },
    /// Gave up waiting. Callers proceed anyway.
    TimedOut { waited: Duration },
}

/// Waits, at most `policy.ceiling`, for the thread to have no executing runs.
pub fn drain(
    api: &dyn AssistantsApi,
    clock: &dyn Clock,
    thread_id: &str,
    policy: &DrainPolicy,
) -> ApiResult<DrainOutcome> {
    let started = clock.now();

    loop {
        let elapsed = clock.now().saturating_duration_since(started);

        match backlog(&api.list_runs(thread_id)?) {
            Backlog::Clear => return Ok(DrainOutcome::Idle),
            Backlog::ActionPending(run_id) => {
                tracing::info!("Run {} requires action - continuing with function calling", run_id);
                return Ok(DrainOutcome::ActionPending { run_id });
            }
            Backlog::Active(status) => {
                if elapsed >= policy.ceiling {
                    tracing::warn!(
                        "Timed out after waiting {} seconds for run to complete",
                        policy.ceiling.as_secs()
                    );
                    return Ok(DrainOutcome::TimedOut { waited: elapsed });
                }
                tracing::info!(
                    "Waiting for active run to complete ({})... {}s elapsed",
                    status,
                    elapsed.as_secs()
                );
                clock.sleep(policy.interval.min(policy.ceiling - elapsed));
            }
        }
    }
}
