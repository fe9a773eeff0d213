use super::{deadline_after, not_found, Error, Result};
use crate::errs;
use std::future::Future;
use std::time::Duration;
use tfplug::Context;
use tokio::time::Instant;

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);

/// Re-runs `op` while `retryable` accepts its error, until it succeeds or
/// `timeout` elapses. The last error is returned on timeout.
pub async fn retry_when<T, F, Fut, P>(
    ctx: &Context,
    timeout: Duration,
    mut op: F,
    retryable: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let deadline = deadline_after(timeout);
    let mut wait = INITIAL_WAIT;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !retryable(&err) {
            return Err(err);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(err);
        }

        tracing::debug!(error = %err, wait = ?wait, "retrying");
        if !ctx.sleep(wait.min(remaining)).await {
            return Err(Error::Cancelled);
        }
        wait = (wait * 2).min(MAX_WAIT);
    }
}

/// Retries while the AWS error code is `code` and its message contains
/// `needle`.
pub async fn retry_when_is_a_error_message_contains<T, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    op: F,
    code: &str,
    needle: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_when(ctx, timeout, op, |err| {
        errs::is_a_error_message_contains(err, code, needle)
    })
    .await
}

/// Runs `op` up to `attempts` times while it fails with an access denied
/// error, sleeping `delay` between attempts. IAM changes made just before
/// the call can take a few seconds to propagate.
pub async fn retry_while_access_denied<T, F, Fut>(
    ctx: &Context,
    attempts: usize,
    delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if errs::is_access_denied(&err) && attempt < attempts => {
                tracing::debug!(attempt, error = %err, "access denied, retrying");
                if !ctx.sleep(delay).await {
                    return Err(Error::Cancelled);
                }
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Retries not-found errors for a resource that was just created and may
/// not be visible yet. Existing resources fail immediately.
pub async fn retry_when_new_resource_not_found<T, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    op: F,
    is_new_resource: bool,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let retryable = |err: &Error| is_new_resource && not_found(err);
    retry_when(ctx, timeout, op, retryable).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn aws_error(code: &str, message: &str) -> Error {
        Error::Aws {
            code: Some(code.to_string()),
            message: Some(message.to_string()),
            display: format!("{code}: {message}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn access_denied_is_retried_a_fixed_number_of_times() {
        let calls = AtomicUsize::new(0);
        let err = retry_while_access_denied(&Context::new(), 3, Duration::from_secs(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(aws_error(
                    "AccessDeniedException",
                    "Insufficient permissions to create domain",
                ))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(errs::is_a(&err, "AccessDeniedException"));
    }

    #[tokio::test(start_paused = true)]
    async fn access_denied_retry_returns_first_success() {
        let calls = AtomicUsize::new(0);
        let value = retry_while_access_denied(&Context::new(), 5, Duration::from_secs(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(aws_error("AccessDenied", "not yet"))
                } else {
                    Ok("dzd_123")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "dzd_123");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result = retry_while_access_denied(&Context::new(), 5, Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(aws_error("ValidationException", "bad name")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_when_message_matches_until_timeout() {
        let calls = AtomicUsize::new(0);
        let err = retry_when_is_a_error_message_contains(
            &Context::new(),
            Duration::from_secs(2),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<(), _>(aws_error(
                        "AssessmentRunInProgressException",
                        "runs in progress",
                    ))
                }
            },
            "AssessmentRunInProgressException",
            "in progress",
        )
        .await
        .unwrap_err();

        assert!(errs::is_a(&err, "AssessmentRunInProgressException"));
        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_resource_not_found_is_retried() {
        let calls = AtomicUsize::new(0);
        let value = retry_when_new_resource_not_found(
            &Context::new(),
            Duration::from_secs(60),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Error::not_found("not visible yet"))
                    } else {
                        Ok(42)
                    }
                }
            },
            true,
        )
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn existing_resource_not_found_fails_immediately() {
        let calls = AtomicUsize::new(0);
        let err = retry_when_new_resource_not_found(
            &Context::new(),
            Duration::from_secs(60),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Error::EmptyResult) }
            },
            false,
        )
        .await
        .unwrap_err();

        assert!(not_found(&err));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
