use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    /// `initial * factor^n` for the n-th retry.
    Exponential { initial: Duration, factor: u32 },
}

impl Backoff {
    pub fn delay_for(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, factor } => {
                initial.saturating_mul(factor.saturating_pow(retry))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::Fixed(delay) }
    }

    pub fn exponential(max_attempts: u32, initial: Duration, factor: u32) -> Self {
        Self { max_attempts, backoff: Backoff::Exponential { initial, factor } }
    }
}

/// Final result plus how many times the operation was re-run.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub retries: u32,
}

/// Runs `op` until it succeeds, returns a non-retryable error, or the attempt
/// ceiling is reached. Sleeps according to the policy between attempts.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> Retried<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Retried { result: Ok(value), retries },
            Err(e) => {
                let attempt = retries + 1;
                if attempt >= max_attempts || !is_retryable(&e) {
                    return Retried { result: Err(e), retries };
                }
                let delay = policy.backoff.delay_for(retries);
                debug!("🔁 Attempt {}/{} failed ({}), retrying in {:?}", attempt, max_attempts, e, delay);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                retries += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Soft,
        Hard,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_soft_failures() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let out = retry_with_backoff(&policy, |e| *e == TestError::Soft, || {
            let n = calls.get();
            calls.set(n + 1);
            async move { if n < 2 { Err(TestError::Soft) } else { Ok(n) } }
        })
        .await;
        assert_eq!(out.result, Ok(2));
        assert_eq!(out.retries, 2);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_attempt_ceiling() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let out: Retried<(), TestError> = retry_with_backoff(&policy, |_| true, || {
            calls.set(calls.get() + 1);
            async { Err(TestError::Soft) }
        })
        .await;
        assert_eq!(out.result, Err(TestError::Soft));
        assert_eq!(out.retries, 2);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::fixed(5, Duration::ZERO);
        let out: Retried<(), TestError> = retry_with_backoff(&policy, |e| *e == TestError::Soft, || {
            calls.set(calls.get() + 1);
            async { Err(TestError::Hard) }
        })
        .await;
        assert_eq!(out.result, Err(TestError::Hard));
        assert_eq!(out.retries, 0);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_exponential_policy_waits_longer_each_retry() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::exponential(3, Duration::from_millis(5), 2);
        let started = std::time::Instant::now();
        let out: Retried<(), TestError> = retry_with_backoff(&policy, |e| *e == TestError::Soft, || {
            calls.set(calls.get() + 1);
            async { Err(TestError::Soft) }
        })
        .await;
        assert_eq!(out.retries, 2);
        assert_eq!(calls.get(), 3);
        // 5ms then 10ms
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_exponential_schedule() {
        let backoff = Backoff::Exponential { initial: Duration::from_millis(100), factor: 2 };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(800));
    }
}
