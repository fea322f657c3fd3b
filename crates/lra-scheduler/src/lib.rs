//! Scheduler: rate-limit classification, fallback backoff, and cancellable waits.

pub mod backoff;
pub mod rate_limit;
pub mod wait;

pub use backoff::{BackoffPolicy, BackoffState, ResolvedWait, WaitSource, compute_fallback_wait};
pub use rate_limit::{RateLimitClass, classify_failure};
pub use wait::{WaitOutcome, format_wait_time, progress_interval, wait_with_progress};
