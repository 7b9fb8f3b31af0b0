//! Bounded retry of a single remote action under a timeout budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::ApiError;
use crate::backoff::Backoff;

/// Why a retried action gave up.
#[derive(Debug)]
pub enum RetryError {
    /// Every attempt was retryable and the next wait would overrun the budget.
    Exhausted { attempts: u32, last: ApiError },
    /// An attempt failed with a non-retryable classification.
    Failed { attempts: u32, error: ApiError },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn error(&self) -> &ApiError {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Failed { error, .. } => error,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Failed { error, .. } if error.is_not_found())
    }
}

/// Run `op` until it succeeds, fails fatally, or the budget runs out.
///
/// `op` receives the budget still remaining so each call can bound its own
/// network timeout. Nothing is attempted once the budget is spent; a retry is
/// only scheduled when it would start strictly inside the budget.
pub async fn retry<T, F, Fut>(
    action: &str,
    budget: Duration,
    backoff: &Backoff,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            tracing::warn!(action, attempts, ?budget, "budget spent before attempt");
            return Err(RetryError::Exhausted {
                attempts,
                last: ApiError::Timeout {
                    action: action.to_string(),
                    timeout: budget,
                },
            });
        }
        attempts += 1;

        let error = match op(remaining).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() => error,
            Err(error) => return Err(RetryError::Failed { attempts, error }),
        };

        let wait = backoff.next_wait(attempts - 1);
        if started.elapsed() + wait >= budget {
            tracing::warn!(action, attempts, ?budget, "retry budget exhausted");
            return Err(RetryError::Exhausted {
                attempts,
                last: error,
            });
        }

        tracing::warn!(action, attempts, ?wait, error = %error, "retryable failure, backing off");
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorClass;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn throttled() -> ApiError {
        ApiError::Service {
            action: "CreateTopic".to_string(),
            status: 400,
            code: "Throttling.User".to_string(),
            message: "too many requests".to_string(),
            request_id: None,
            class: ErrorClass::Retryable,
        }
    }

    fn fatal() -> ApiError {
        ApiError::Service {
            action: "CreateTopic".to_string(),
            status: 400,
            code: "InvalidParameter".to_string(),
            message: "bad topic".to_string(),
            request_id: None,
            class: ErrorClass::Fatal,
        }
    }

    async fn count_attempts(budget: Duration, step: Duration) -> u32 {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError> =
            retry("CreateTopic", budget, &Backoff::fixed(step), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(throttled()) }
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { .. }));
        assert_eq!(err.attempts(), calls.load(Ordering::SeqCst));
        calls.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_ceiling_of_budget_over_step() {
        let step = Duration::from_secs(3);
        assert_eq!(count_attempts(Duration::from_secs(10), step).await, 4);
        assert_eq!(count_attempts(Duration::from_secs(9), step).await, 3);
        assert_eq!(count_attempts(Duration::from_secs(60), step).await, 20);
        assert_eq!(count_attempts(Duration::from_secs(1), step).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_overruns_budget() {
        let started = Instant::now();
        let budget = Duration::from_secs(30);
        let _ = count_attempts(budget, Duration::from_secs(7)).await;
        assert!(started.elapsed() < budget);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry(
            "CreateTopic",
            Duration::from_secs(60),
            &Backoff::default(),
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(throttled()) } else { Ok("done") } }
            },
        )
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError> = retry(
            "CreateTopic",
            Duration::from_secs(60),
            &Backoff::default(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(fatal()) }
            },
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Failed { attempts: 1, .. }));
        assert_eq!(err.error().code(), Some("InvalidParameter"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spent_budget_makes_no_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RetryError> =
            retry("DescribeInstances", Duration::ZERO, &Backoff::default(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 0, .. }));
        assert!(matches!(err.error(), ApiError::Timeout { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_budget_shrinks_between_attempts() {
        let seen = std::sync::Mutex::new(Vec::new());
        let _: Result<(), RetryError> = retry(
            "GetTemplate",
            Duration::from_secs(10),
            &Backoff::fixed(Duration::from_secs(4)),
            |remaining| {
                seen.lock().unwrap().push(remaining);
                async { Err(throttled()) }
            },
        )
        .await;
        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(6),
                Duration::from_secs(2)
            ]
        );
    }
}
