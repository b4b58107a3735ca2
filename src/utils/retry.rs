use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff Retry Strategy
// ============================================================================
//
// Re-runs an operation while it fails with a transient error. Optimistic
// lock conflicts are the transient case in this crate: the whole
// read-modify-write cycle is repeated against a fresh copy.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Upper bound for the backoff
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Short, frequent retries for version conflicts on a single row
    pub fn for_conflicts() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.multiplier).min(self.max_delay)
    }
}

/// How a retried operation ended
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Still transient when the attempts ran out
    Failed(E),
    /// Not worth repeating, returned on the attempt that produced it
    PermanentFailure(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
        }
    }
}

pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Run `attempt_fn` until it succeeds, fails permanently, or uses up
/// `config.max_attempts`. The closure receives the 1-based attempt number.
pub async fn retry_on_transient<F, Fut, T, E>(
    operation: &'static str,
    config: RetryConfig,
    mut attempt_fn: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match attempt_fn(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation = operation, attempt = attempt, "🔄 Succeeded after retry");
                }
                return RetryResult::Success(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            tracing::debug!(operation = operation, error = %error, "Permanent failure, not retrying");
            return RetryResult::PermanentFailure(error);
        }

        if attempt >= config.max_attempts {
            tracing::error!(
                operation = operation,
                attempts = attempt,
                error = %error,
                "❌ Giving up after repeated conflicts"
            );
            return RetryResult::Failed(error);
        }

        tracing::warn!(
            operation = operation,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Conflict, backing off before next attempt"
        );
        sleep(delay).await;
        delay = config.next_delay(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Outcome {
        Conflict,
        Rejected,
        Done,
    }

    impl std::fmt::Display for Outcome {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl IsTransient for Outcome {
        fn is_transient(&self) -> bool {
            *self == Outcome::Conflict
        }
    }

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    /// Plays back `script` one entry per attempt and records attempt numbers
    async fn play(config: RetryConfig, script: &[Outcome]) -> (RetryResult<u32, Outcome>, Vec<u32>) {
        let seen = Mutex::new(Vec::new());
        let result = retry_on_transient("test", config, |attempt| {
            seen.lock().unwrap().push(attempt);
            let outcome = script[(attempt - 1) as usize];
            async move {
                match outcome {
                    Outcome::Done => Ok(attempt),
                    other => Err(other),
                }
            }
        })
        .await;
        (result, seen.into_inner().unwrap())
    }

    #[tokio::test]
    async fn test_conflicts_are_retried_until_success() {
        let script = [Outcome::Conflict, Outcome::Conflict, Outcome::Done];

        let (result, attempts) = play(quick(3), &script).await;

        assert!(matches!(result, RetryResult::Success(3)));
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_gives_up_when_attempts_run_out() {
        let script = [Outcome::Conflict, Outcome::Conflict, Outcome::Done];

        let (result, attempts) = play(quick(2), &script).await;

        assert!(matches!(result, RetryResult::Failed(Outcome::Conflict)));
        assert_eq!(attempts, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_rejection_stops_immediately() {
        let script = [Outcome::Rejected, Outcome::Done];

        let (result, attempts) = play(quick(5), &script).await;

        assert!(matches!(result, RetryResult::PermanentFailure(Outcome::Rejected)));
        assert!(!result.is_success());
        assert_eq!(attempts, vec![1]);
    }

    #[test]
    fn test_backoff_doubles_up_to_the_cap() {
        let config = quick(3);

        assert_eq!(config.next_delay(Duration::from_millis(1)), Duration::from_millis(2));
        assert_eq!(config.next_delay(Duration::from_millis(4)), Duration::from_millis(5));
    }
}
