//! The session loop: `Starting -> Running <-> Waiting -> Done | Aborted`.
//!
//! `Starting` (workspace setup, fresh-vs-resume) happens in `run_cmd`; this
//! module owns everything after it. All loop state lives in [`LoopState`],
//! which is passed in and returned by [`apply_outcome`] so the transitions
//! can be tested without a backend or a clock.

use async_trait::async_trait;
use lra_core::{SessionKind, SessionOutcome};
use lra_scheduler::{BackoffPolicy, BackoffState, ResolvedWait, WaitOutcome, wait_with_progress};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs one session of the given kind. Never fails: every failure is an outcome.
#[async_trait]
pub trait SessionLauncher: Send {
    async fn launch(&mut self, kind: SessionKind, session: u32) -> SessionOutcome;
}

/// Receives loop progress for display.
pub trait LoopObserver {
    fn on_event(&mut self, event: LoopEvent);
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    SessionStarting {
        session: u32,
        kind: SessionKind,
    },
    SessionContinued {
        session: u32,
        next_in: Duration,
    },
    SessionFailed {
        message: String,
        retry_in: Duration,
    },
    RateLimited {
        attempt: u32,
        ceiling: u32,
        wait: ResolvedWait,
    },
    WaitProgress {
        remaining: Duration,
    },
    WaitComplete,
    PreparingNext,
    MaxIterationsReached {
        max: u32,
    },
    RetryCeilingExceeded {
        retries: u32,
        ceiling: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub max_iterations: Option<u32>,
    /// Consecutive rate-limited sessions tolerated before aborting.
    pub retry_ceiling: u32,
    pub policy: BackoffPolicy,
    pub auto_continue_delay: Duration,
    pub between_sessions_delay: Duration,
}

/// Everything the loop carries between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    /// Successful sessions so far. Only `Continue` advances it.
    pub completed: u32,
    /// The initializer still has to run (fresh project).
    pub initializer_pending: bool,
    pub backoff: BackoffState,
}

impl LoopState {
    pub fn new(fresh: bool) -> Self {
        Self {
            completed: 0,
            initializer_pending: fresh,
            backoff: BackoffState::default(),
        }
    }

    /// Index of the session about to run, starting at 1.
    pub fn next_session(&self) -> u32 {
        self.completed + 1
    }

    pub fn next_kind(&self) -> SessionKind {
        if self.initializer_pending {
            SessionKind::Initializer
        } else {
            SessionKind::Coding
        }
    }
}

/// What the loop does after a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Short pause, then the next session.
    Pause(Duration),
    /// Rate-limited: wait, then re-attempt the same unit of work.
    Wait(ResolvedWait),
    /// Retry ceiling exceeded.
    Abort { retries: u32 },
}

/// Fold one outcome into the loop state.
pub fn apply_outcome(
    state: LoopState,
    outcome: &SessionOutcome,
    settings: &LoopSettings,
) -> (LoopState, Step) {
    match outcome {
        SessionOutcome::Continue { .. } => (
            LoopState {
                completed: state.completed + 1,
                initializer_pending: false,
                backoff: state.backoff.reset(),
            },
            Step::Pause(settings.auto_continue_delay),
        ),
        SessionOutcome::Error { .. } => (
            // Errors are retried as-is: no backoff, no ceiling.
            LoopState {
                initializer_pending: false,
                ..state
            },
            Step::Pause(settings.auto_continue_delay),
        ),
        SessionOutcome::RateLimited {
            retry_after_secs, ..
        } => {
            let backoff = state.backoff.record_rate_limit();
            let next = LoopState { backoff, ..state };
            if backoff.exceeds(settings.retry_ceiling) {
                return (
                    next,
                    Step::Abort {
                        retries: backoff.retry_count,
                    },
                );
            }
            let wait = settings
                .policy
                .resolve_wait(*retry_after_secs, backoff.last_wait_was_fallback);
            (next, Step::Wait(wait))
        }
    }
}

/// Record a finished wait so the next fallback can escalate.
pub fn after_wait(state: LoopState, wait: &ResolvedWait) -> LoopState {
    LoopState {
        backoff: state.backoff.record_wait(wait),
        ..state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Maximum iterations reached.
    Done,
    /// Rate-limit retry ceiling exceeded.
    Aborted { retries: u32 },
    /// Cancelled from outside (Ctrl+C).
    Interrupted,
}

impl Termination {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Done => 0,
            Self::Aborted { .. } => 2,
            Self::Interrupted => 130,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub termination: Termination,
    pub state: LoopState,
}

/// Drive sessions until a terminal state.
pub async fn run_loop<L, O>(
    launcher: &mut L,
    observer: &mut O,
    settings: &LoopSettings,
    initial: LoopState,
    cancel: &CancellationToken,
) -> LoopSummary
where
    L: SessionLauncher + ?Sized,
    O: LoopObserver + ?Sized,
{
    let mut state = initial;
    let finish = |termination, state| LoopSummary { termination, state };

    loop {
        if cancel.is_cancelled() {
            return finish(Termination::Interrupted, state);
        }

        let session = state.next_session();
        if let Some(max) = settings.max_iterations
            && session > max
        {
            observer.on_event(LoopEvent::MaxIterationsReached { max });
            return finish(Termination::Done, state);
        }

        let kind = state.next_kind();
        info!(session, kind = %kind, retries = state.backoff.retry_count, "Starting session");
        observer.on_event(LoopEvent::SessionStarting { session, kind });

        let outcome = tokio::select! {
            () = cancel.cancelled() => return finish(Termination::Interrupted, state),
            outcome = launcher.launch(kind, session) => outcome,
        };

        let (next, step) = apply_outcome(state, &outcome, settings);
        state = next;

        match step {
            Step::Pause(delay) => {
                match &outcome {
                    SessionOutcome::Error { message } => {
                        observer.on_event(LoopEvent::SessionFailed {
                            message: message.clone(),
                            retry_in: delay,
                        });
                    }
                    _ => observer.on_event(LoopEvent::SessionContinued {
                        session,
                        next_in: delay,
                    }),
                }
                if sleep_or_cancel(delay, cancel).await == WaitOutcome::Cancelled {
                    return finish(Termination::Interrupted, state);
                }
            }
            Step::Wait(wait) => {
                info!(
                    attempt = state.backoff.retry_count,
                    wait_secs = wait.duration.as_secs(),
                    source = ?wait.source,
                    "Rate limited, waiting"
                );
                observer.on_event(LoopEvent::RateLimited {
                    attempt: state.backoff.retry_count,
                    ceiling: settings.retry_ceiling,
                    wait,
                });
                let waited = wait_with_progress(wait.duration, cancel, |remaining| {
                    observer.on_event(LoopEvent::WaitProgress { remaining });
                })
                .await;
                if waited == WaitOutcome::Cancelled {
                    return finish(Termination::Interrupted, state);
                }
                observer.on_event(LoopEvent::WaitComplete);
                state = after_wait(state, &wait);
            }
            Step::Abort { retries } => {
                warn!(retries, ceiling = settings.retry_ceiling, "Rate-limit retry ceiling exceeded");
                observer.on_event(LoopEvent::RetryCeilingExceeded {
                    retries,
                    ceiling: settings.retry_ceiling,
                });
                return finish(Termination::Aborted { retries }, state);
            }
        }

        let more_to_do = settings
            .max_iterations
            .is_none_or(|max| state.completed < max);
        if more_to_do {
            observer.on_event(LoopEvent::PreparingNext);
            if sleep_or_cancel(settings.between_sessions_delay, cancel).await
                == WaitOutcome::Cancelled
            {
                return finish(Termination::Interrupted, state);
            }
        }
    }
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> WaitOutcome {
    tokio::select! {
        () = cancel.cancelled() => WaitOutcome::Cancelled,
        () = tokio::time::sleep(delay) => WaitOutcome::Completed,
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
