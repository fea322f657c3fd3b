//! Human-readable wait durations and chunked, cancellable waiting.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const LONG_WAIT_THRESHOLD: Duration = Duration::from_secs(120);
const LONG_WAIT_TICK: Duration = Duration::from_secs(60);
const SHORT_WAIT_TICK: Duration = Duration::from_secs(10);

/// Format seconds as "30 seconds", "5 minutes", "1 hour", "2 hours 30 min".
///
/// Minutes are truncated; seconds are dropped once the value reaches a minute.
pub fn format_wait_time(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds} seconds");
    }
    if seconds < 3600 {
        let minutes = seconds / 60;
        return format!("{minutes} minute{}", plural(minutes));
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if minutes > 0 {
        format!("{hours} hour{} {minutes} min", plural(hours))
    } else {
        format!("{hours} hour{}", plural(hours))
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// How often remaining time is reported for a wait of `total`.
pub fn progress_interval(total: Duration) -> Duration {
    if total > LONG_WAIT_THRESHOLD {
        LONG_WAIT_TICK
    } else {
        SHORT_WAIT_TICK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    Cancelled,
}

/// Sleep for `total` in bounded chunks.
///
/// `on_progress` receives the remaining time after every chunk except the
/// last. Cancellation is observed at every chunk.
pub async fn wait_with_progress<F>(
    total: Duration,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> WaitOutcome
where
    F: FnMut(Duration),
{
    let tick = progress_interval(total);
    let mut remaining = total;

    while !remaining.is_zero() {
        let chunk = tick.min(remaining);
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(remaining_secs = remaining.as_secs(), "Wait cancelled");
                return WaitOutcome::Cancelled;
            }
            () = tokio::time::sleep(chunk) => {}
        }
        remaining -= chunk;
        if !remaining.is_zero() {
            on_progress(remaining);
        }
    }

    WaitOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_wait_time(0), "0 seconds");
        assert_eq!(format_wait_time(30), "30 seconds");
        assert_eq!(format_wait_time(59), "59 seconds");
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_wait_time(60), "1 minute");
        assert_eq!(format_wait_time(90), "1 minute");
        assert_eq!(format_wait_time(150), "2 minutes");
        assert_eq!(format_wait_time(3599), "59 minutes");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_wait_time(3600), "1 hour");
        assert_eq!(format_wait_time(5400), "1 hour 30 min");
        assert_eq!(format_wait_time(5 * 3600), "5 hours");
        assert_eq!(format_wait_time(24 * 3600 + 60), "24 hours 1 min");
    }

    #[test]
    fn test_progress_interval() {
        assert_eq!(progress_interval(Duration::from_secs(120)), SHORT_WAIT_TICK);
        assert_eq!(progress_interval(Duration::from_secs(121)), LONG_WAIT_TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reports_remaining_time() {
        let cancel = CancellationToken::new();
        let mut ticks = Vec::new();
        let outcome =
            wait_with_progress(Duration::from_secs(25), &cancel, |r| ticks.push(r.as_secs())).await;
        assert_eq!(outcome, WaitOutcome::Completed);
        assert_eq!(ticks, vec![15, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_wait_ticks_every_minute() {
        let cancel = CancellationToken::new();
        let mut count = 0;
        let start = tokio::time::Instant::now();
        let outcome = wait_with_progress(Duration::from_secs(5 * 3600), &cancel, |_| count += 1).await;
        assert_eq!(outcome, WaitOutcome::Completed);
        assert_eq!(count, 5 * 60 - 1);
        assert_eq!(start.elapsed(), Duration::from_secs(5 * 3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_returns_early() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = wait_with_progress(Duration::from_secs(3600), &cancel, |_| {}).await;
        assert_eq!(outcome, WaitOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_wait_completes_immediately() {
        let cancel = CancellationToken::new();
        let mut called = false;
        let outcome = wait_with_progress(Duration::ZERO, &cancel, |_| called = true).await;
        assert_eq!(outcome, WaitOutcome::Completed);
        assert!(!called);
    }
}
