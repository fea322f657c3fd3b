//! Two-tier fallback backoff for rate limits that carry no explicit wait.
//!
//! A backend quota window is either short or long, so the policy only
//! distinguishes "first fallback" from "fallback again right after a
//! fallback wait". There is no exponential growth.

use serde::Serialize;
use std::time::Duration;

/// Fallback wait the first time no explicit duration is available (5 hours).
pub const FALLBACK_WAIT_FIRST_SECS: u64 = 5 * 60 * 60;
/// Fallback wait when the previous wait was also a fallback (24 hours).
pub const FALLBACK_WAIT_EXTENDED_SECS: u64 = 24 * 60 * 60;
/// Upper bound applied to explicit waits (24 hours).
pub const MAX_WAIT_SECS: u64 = 24 * 60 * 60;

/// Fixed durations used when resolving a rate-limit wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub first_fallback: Duration,
    pub extended_fallback: Duration,
    pub max_wait: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first_fallback: Duration::from_secs(FALLBACK_WAIT_FIRST_SECS),
            extended_fallback: Duration::from_secs(FALLBACK_WAIT_EXTENDED_SECS),
            max_wait: Duration::from_secs(MAX_WAIT_SECS),
        }
    }
}

/// Where a resolved wait duration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaitSource {
    /// Taken from the backend's failure description.
    Explicit,
    /// First fallback.
    Fallback,
    /// Fallback immediately after another fallback wait.
    ExtendedFallback,
}

/// A wait duration together with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWait {
    pub duration: Duration,
    pub source: WaitSource,
}

impl ResolvedWait {
    pub fn used_fallback(&self) -> bool {
        !matches!(self.source, WaitSource::Explicit)
    }
}

impl BackoffPolicy {
    /// Wait used when the failure carried no explicit duration.
    pub fn fallback_wait(&self, last_wait_was_fallback: bool) -> Duration {
        if last_wait_was_fallback {
            self.extended_fallback
        } else {
            self.first_fallback
        }
    }

    /// Prefer the explicit hint (clamped to `max_wait`), else fall back.
    pub fn resolve_wait(
        &self,
        explicit_secs: Option<u64>,
        last_wait_was_fallback: bool,
    ) -> ResolvedWait {
        match explicit_secs {
            Some(secs) => ResolvedWait {
                duration: Duration::from_secs(secs).min(self.max_wait),
                source: WaitSource::Explicit,
            },
            None => ResolvedWait {
                duration: self.fallback_wait(last_wait_was_fallback),
                source: if last_wait_was_fallback {
                    WaitSource::ExtendedFallback
                } else {
                    WaitSource::Fallback
                },
            },
        }
    }
}

/// Fallback wait in seconds under the default policy.
pub fn compute_fallback_wait(last_wait_was_fallback: bool) -> u64 {
    BackoffPolicy::default()
        .fallback_wait(last_wait_was_fallback)
        .as_secs()
}

/// Rate-limit bookkeeping carried across orchestration steps.
///
/// Values are replaced rather than mutated in place: every transition
/// returns the next state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackoffState {
    /// Consecutive rate-limited sessions since the last success.
    pub retry_count: u32,
    /// Whether the most recent wait had to use the fallback policy.
    pub last_wait_was_fallback: bool,
}

impl BackoffState {
    /// State after a successful session.
    pub fn reset(self) -> Self {
        Self::default()
    }

    /// State after one more rate-limited session.
    pub fn record_rate_limit(self) -> Self {
        Self {
            retry_count: self.retry_count.saturating_add(1),
            ..self
        }
    }

    /// State after a wait has been served.
    pub fn record_wait(self, wait: &ResolvedWait) -> Self {
        Self {
            last_wait_was_fallback: wait.used_fallback(),
            ..self
        }
    }

    pub fn exceeds(&self, ceiling: u32) -> bool {
        self.retry_count > ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fallback_shorter_than_extended() {
        assert!(compute_fallback_wait(false) < compute_fallback_wait(true));
        assert_eq!(compute_fallback_wait(false), FALLBACK_WAIT_FIRST_SECS);
    }

    #[test]
    fn test_extended_fallback_holds_at_ceiling() {
        let first = compute_fallback_wait(true);
        let second = compute_fallback_wait(true);
        assert_eq!(first, second);
        assert_eq!(first, FALLBACK_WAIT_EXTENDED_SECS);
    }

    #[test]
    fn test_resolve_prefers_explicit_hint() {
        let policy = BackoffPolicy::default();
        let wait = policy.resolve_wait(Some(120), true);
        assert_eq!(wait.duration, Duration::from_secs(120));
        assert_eq!(wait.source, WaitSource::Explicit);
        assert!(!wait.used_fallback());
    }

    #[test]
    fn test_resolve_clamps_explicit_hint() {
        let policy = BackoffPolicy::default();
        let wait = policy.resolve_wait(Some(u64::MAX), false);
        assert_eq!(wait.duration, Duration::from_secs(MAX_WAIT_SECS));
    }

    #[test]
    fn test_resolve_escalates_after_fallback() {
        let policy = BackoffPolicy::default();
        let first = policy.resolve_wait(None, false);
        assert_eq!(first.source, WaitSource::Fallback);
        assert_eq!(first.duration, policy.first_fallback);

        let second = policy.resolve_wait(None, true);
        assert_eq!(second.source, WaitSource::ExtendedFallback);
        assert_eq!(second.duration, policy.extended_fallback);
    }

    #[test]
    fn test_state_counts_and_resets() {
        let state = BackoffState::default()
            .record_rate_limit()
            .record_rate_limit();
        assert_eq!(state.retry_count, 2);

        let fallback = BackoffPolicy::default().resolve_wait(None, false);
        let state = state.record_wait(&fallback);
        assert!(state.last_wait_was_fallback);

        let state = state.reset();
        assert_eq!(state, BackoffState::default());
    }

    #[test]
    fn test_explicit_wait_clears_fallback_flag() {
        let policy = BackoffPolicy::default();
        let state = BackoffState {
            retry_count: 1,
            last_wait_was_fallback: true,
        };
        let state = state.record_wait(&policy.resolve_wait(Some(30), true));
        assert!(!state.last_wait_was_fallback);
        assert_eq!(state.retry_count, 1);
    }

    #[test]
    fn test_exceeds_is_strict() {
        let at_ceiling = BackoffState {
            retry_count: 10,
            last_wait_was_fallback: false,
        };
        assert!(!at_ceiling.exceeds(10));
        assert!(at_ceiling.record_rate_limit().exceeds(10));
    }
}
