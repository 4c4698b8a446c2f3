use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retry on a schedule twice as long as the base one
    RateLimited,
    Transient,
    /// Fail immediately
    Permanent,
}

pub trait Classify {
    fn failure_class(&self) -> FailureClass;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1_000, 30_000)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retrying after the failure of `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32, class: FailureClass) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let mut delay = self.base_delay.saturating_mul(factor);
        if class == FailureClass::RateLimited {
            delay = delay.saturating_mul(2);
        }
        delay.min(self.max_delay)
    }

    /// Run `f`, retrying transient and rate-limited failures with
    /// exponential backoff. Permanent failures and the last failure after
    /// `max_retries` retries are returned unchanged.
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Classify + std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    let class = e.failure_class();
                    if class == FailureClass::Permanent {
                        return Err(e);
                    }

                    if attempt >= self.max_retries {
                        warn!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            error = %e,
                            "Operation failed after max retries"
                        );
                        return Err(e);
                    }

                    let backoff = self.delay_for(attempt, class);
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn status(status: u16) -> LookupError {
        LookupError::Status {
            status,
            body: "error".to_string(),
        }
    }

    /// Call instants recorded by a scripted operation.
    struct Script {
        calls: AtomicUsize,
        at: Mutex<Vec<Instant>>,
    }

    impl Script {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                at: Mutex::new(Vec::new()),
            }
        }

        /// Fail with `statuses` in order, then succeed.
        async fn run(&self, statuses: &[u16]) -> Result<&'static str, LookupError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.at.lock().unwrap().push(Instant::now());
            match statuses.get(n) {
                Some(code) => Err(status(*code)),
                None => Ok("ok"),
            }
        }

        fn gaps(&self) -> Vec<Duration> {
            let at = self.at.lock().unwrap();
            at.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0, FailureClass::Transient), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1, FailureClass::Transient), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, FailureClass::Transient), Duration::from_secs(4));
        assert_eq!(policy.delay_for(0, FailureClass::RateLimited), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, FailureClass::RateLimited), Duration::from_secs(8));
        assert_eq!(policy.delay_for(6, FailureClass::Transient), Duration::from_secs(30));
        assert_eq!(policy.delay_for(40, FailureClass::RateLimited), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_are_retried_with_growing_delays() {
        let script = Script::new();
        let policy = RetryPolicy::default();

        let result = policy.retry("lookup", || script.run(&[500, 500])).await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(script.calls.load(Ordering::SeqCst), 3);
        let gaps = script.gaps();
        assert!(gaps[0] >= Duration::from_secs(1));
        assert!(gaps[1] >= Duration::from_secs(2));
        assert!(gaps[1] > gaps[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let script = Script::new();
        let policy = RetryPolicy::default();

        let result = policy.retry("lookup", || script.run(&[404])).await;

        match result {
            Err(LookupError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected 404, got {:?}", other),
        }
        assert_eq!(script.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_request_is_retried() {
        let script = Script::new();
        let policy = RetryPolicy::default();

        let result = policy.retry("lookup", || script.run(&[400])).await;

        assert!(result.is_ok());
        assert_eq!(script.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_twice_as_long() {
        let script = Script::new();
        let policy = RetryPolicy::default();

        policy.retry("lookup", || script.run(&[429, 429])).await.unwrap();

        let gaps = script.gaps();
        assert!(gaps[0] >= Duration::from_secs(2));
        assert!(gaps[1] >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let script = Script::new();
        let policy = RetryPolicy::new(3, 10, 100);

        let result = policy.retry("lookup", || script.run(&[500, 502, 503, 504, 500])).await;

        match result {
            Err(LookupError::Status { status, .. }) => assert_eq!(status, 504),
            other => panic!("expected 504, got {:?}", other),
        }
        assert_eq!(script.calls.load(Ordering::SeqCst), 4);
    }
}
