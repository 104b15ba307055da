//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every attempt by the request timeout
//! - Race attempts and backoff sleeps against caller cancellation
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Cancellation wins ties so a cancelled call never reports a timeout
//! - Dropping the attempt future aborts the in-flight request

use std::future::Future;
use std::time::Duration;

use crate::lifecycle::cancel::CancelToken;

/// How a bounded attempt ended.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Completed(T),
    TimedOut,
    Cancelled,
}

/// Run `attempt` until it completes, `limit` elapses or `cancel` fires.
pub async fn run_attempt<F>(
    attempt: F,
    limit: Duration,
    cancel: Option<&CancelToken>,
) -> AttemptOutcome<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = wait_cancelled(cancel) => AttemptOutcome::Cancelled,
        result = tokio::time::timeout(limit, attempt) => match result {
            Ok(output) => AttemptOutcome::Completed(output),
            Err(_) => AttemptOutcome::TimedOut,
        },
    }
}

/// Sleep for `delay`. Returns `true` if cancelled before the delay elapsed.
pub async fn sleep_or_cancel(delay: Duration, cancel: Option<&CancelToken>) -> bool {
    tokio::select! {
        biased;
        _ = wait_cancelled(cancel) => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

async fn wait_cancelled(cancel: Option<&CancelToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::cancel::CancelHandle;

    #[tokio::test(start_paused = true)]
    async fn test_attempt_completes() {
        let outcome = run_attempt(async { 7 }, Duration::from_secs(1), None).await;
        assert!(matches!(outcome, AttemptOutcome::Completed(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_times_out() {
        let outcome = run_attempt(
            std::future::pending::<()>(),
            Duration::from_millis(500),
            None,
        )
        .await;
        assert!(matches!(outcome, AttemptOutcome::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_beats_timeout() {
        let handle = CancelHandle::new();
        let token = handle.token();
        handle.cancel();

        let outcome = run_attempt(async { 1 }, Duration::from_secs(1), Some(&token)).await;
        assert!(matches!(outcome, AttemptOutcome::Cancelled));
        assert!(sleep_or_cancel(Duration::from_secs(60), Some(&token)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_without_cancel() {
        let start = tokio::time::Instant::now();
        assert!(!sleep_or_cancel(Duration::from_millis(300), None).await);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}
