//! Retrying part uploads.
//!
//! A [`RetryPolicy`] bounds how often and how patiently a single request is
//! attempted: the number of attempts, the [`ExponentialBackoff`] between them,
//! the predicate deciding which errors are worth another attempt, and the
//! timeout of each attempt.
use crate::error::{Error, ErrorRepr, Result};

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Exponentially growing delay between attempts.
///
/// The delay after the `n`th failed attempt is
/// `initial_delay * scaling^(n - 1)`, capped at `maximum_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            maximum_delay: Duration::from_secs(10),
            scaling: 2.0,
        }
    }
}

impl ExponentialBackoff {
    /// Create a new backoff.
    ///
    /// The scaling factor is clamped to `[1.0, 32.0]` and the maximum delay
    /// is raised to the initial delay if it is smaller.
    pub fn new(initial_delay: Duration, maximum_delay: Duration, scaling: f64) -> Self {
        let scaling = if scaling.is_nan() {
            1.0
        } else {
            scaling.clamp(1.0, 32.0)
        };
        Self {
            initial_delay,
            maximum_delay: maximum_delay.max(initial_delay),
            scaling,
        }
    }

    /// The delay to wait after `attempt_count` failed attempts.
    pub fn delay(&self, attempt_count: u32) -> Duration {
        let exp = attempt_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.scaling.powi(exp);
        if !secs.is_finite() || secs >= self.maximum_delay.as_secs_f64() {
            return self.maximum_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// How a part upload is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: ExponentialBackoff,
    attempt_timeout: Option<Duration>,
    retryable: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: ExponentialBackoff::default(),
            attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
            retryable: Error::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::default().max_attempts(1)
    }

    /// Set the total number of attempts, including the first.
    ///
    /// At least one attempt is always made.
    pub fn max_attempts(self, limit: u32) -> Self {
        Self {
            max_attempts: limit.max(1),
            ..self
        }
    }

    /// Set the delay between attempts.
    pub fn backoff(self, backoff: ExponentialBackoff) -> Self {
        Self { backoff, ..self }
    }

    /// Set the timeout of a single attempt, or `None` for no timeout.
    pub fn attempt_timeout<T: Into<Option<Duration>>>(self, timeout: T) -> Self {
        Self {
            attempt_timeout: timeout.into(),
            ..self
        }
    }

    /// Set the predicate deciding whether an error is worth retrying.
    ///
    /// The default is [`Error::is_retryable`].
    pub fn retry_if(self, retryable: fn(&Error) -> bool) -> Self {
        Self { retryable, ..self }
    }

    /// The total number of attempts.
    pub fn attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether `err` should be retried under this policy.
    pub fn should_retry(&self, err: &Error) -> bool {
        err.kind() != crate::error::ErrorKind::Cancelled && (self.retryable)(err)
    }

    async fn attempt<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| ErrorRepr::Timeout(limit))?,
            None => fut.await,
        }
    }
}

/// The last error of a retry loop and how many attempts were made.
#[derive(Debug)]
pub(crate) struct Exhausted {
    pub(crate) attempts: u32,
    pub(crate) error: Error,
}

/// Call `inner` until it succeeds, it fails with an error the policy does not
/// retry, the attempts run out, or `token` is cancelled.
///
/// Cancellation is observed while an attempt is in flight and while sleeping
/// between attempts. An attempt in flight is dropped when cancelled.
///
/// `on_retry` is called with the attempt count, the error and the delay before
/// sleeping.
pub(crate) async fn retry_loop<T, F, Fut, R>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut inner: F,
    mut on_retry: R,
) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, &Error, Duration),
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ErrorRepr::Cancelled.into()),
            res = policy.attempt(inner(attempts)) => res,
        };
        let error = match outcome {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if attempts >= policy.max_attempts || !policy.should_retry(&error) {
            return Err(Exhausted { attempts, error });
        }

        let delay = policy.backoff.delay(attempts);
        on_retry(attempts, &error, delay);
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                let error = ErrorRepr::Cancelled.into();
                return Err(Exhausted { attempts, error });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> Error {
        Error::retryable(std::io::Error::other("503 slow down"))
    }

    fn permanent() -> Error {
        Error::from_dyn(std::io::Error::other("403 access denied"))
    }

    #[test]
    fn backoff_grows_and_caps() {
        let b = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5), 2.0);
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(b.delay(3), Duration::from_secs(4));
        assert_eq!(b.delay(4), Duration::from_secs(5));
        assert_eq!(b.delay(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn backoff_clamps_arguments() {
        let b = ExponentialBackoff::new(Duration::from_secs(3), Duration::from_secs(1), 0.5);
        assert_eq!(b.delay(1), Duration::from_secs(3));
        assert_eq!(b.delay(10), Duration::from_secs(3));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::default().max_attempts(0).attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let policy = RetryPolicy::default().max_attempts(4);
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let mut delays = Vec::new();

        let res = retry_loop(
            &policy,
            &token,
            |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 3 { Err(transient()) } else { Ok(n) } }
            },
            |_, _, delay| delays.push(delay),
        )
        .await;

        assert_eq!(res.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            delays,
            vec![Duration::from_millis(200), Duration::from_millis(400)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let res: Result<(), _> = retry_loop(
            &policy,
            &token,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(permanent()) }
            },
            |_, _, _| {},
        )
        .await;

        let exhausted = res.unwrap_err();
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(exhausted.error.kind(), ErrorKind::Request);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::default().max_attempts(3);
        let token = CancellationToken::new();

        let res: Result<(), _> =
            retry_loop(&policy, &token, |_| async { Err(transient()) }, |_, _, _| {}).await;

        let exhausted = res.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert!(exhausted.error.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_timeout_is_retried() {
        let policy = RetryPolicy::default()
            .max_attempts(2)
            .attempt_timeout(Duration::from_secs(1));
        let token = CancellationToken::new();

        let res = retry_loop(
            &policy,
            &token,
            |n| async move {
                if n == 1 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok(n)
            },
            |_, err, _| assert!(err.is_retryable()),
        )
        .await;

        assert_eq!(res.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_backoff() {
        let policy = RetryPolicy::default()
            .backoff(ExponentialBackoff::new(
                Duration::from_secs(60),
                Duration::from_secs(60),
                1.0,
            ))
            .max_attempts(10);
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let cancel = token.clone();
        let res: Result<(), _> = retry_loop(
            &policy,
            &token,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
            |_, _, _| cancel.cancel(),
        )
        .await;

        let exhausted = res.unwrap_err();
        assert_eq!(exhausted.error.kind(), ErrorKind::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_drops_attempt_in_flight() {
        let policy = RetryPolicy::default().attempt_timeout(None);
        let token = CancellationToken::new();
        token.cancel();

        let res: Result<(), _> = retry_loop(
            &policy,
            &token,
            |_| std::future::pending(),
            |_, _, _| {},
        )
        .await;

        assert_eq!(res.unwrap_err().error.kind(), ErrorKind::Cancelled);
    }
}
