//! Opt-in bounded retry for engine commands.
//!
//! Nothing in the client retries on its own; callers wrap a command in
//! [`with_retry`] explicitly.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use vidl_core::RetryConfig;

/// Fixed attempt count, fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts,
            delay: config.delay(),
        }
    }
}

/// Run `op` up to `policy.attempts` times (at least once), sleeping
/// `policy.delay` between failures. Returns the first success or the last
/// error.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(attempts = attempt, error = %err, "command failed after all retries");
                return Err(err);
            }
            Err(err) => {
                let delay_ms = policy.delay.as_millis() as u64;
                tracing::info!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "retrying command"
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineCommand, EngineError};
    use std::cell::Cell;
    use tokio::time::Instant;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1_000),
        }
    }

    #[test]
    fn default_policy_matches_default_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_without_sleeping() {
        let calls = Cell::new(0);
        let started = Instant::now();
        let result: Result<u32, EngineError> = with_retry(&policy(3), || {
            calls.set(calls.get() + 1);
            async { Ok(7) }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_with_fixed_delay() {
        let calls = Cell::new(0);
        let started = Instant::now();
        let result = with_retry(&policy(3), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(EngineError::rejected(EngineCommand::Probe, "timeout"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_after_attempts_are_exhausted() {
        let calls = Cell::new(0);
        let result: Result<(), EngineError> = with_retry(&policy(2), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                Err(EngineError::rejected(
                    EngineCommand::Submit,
                    format!("attempt {n}"),
                ))
            }
        })
        .await;

        assert_eq!(
            result,
            Err(EngineError::rejected(EngineCommand::Submit, "attempt 2"))
        );
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let _: Result<(), EngineError> = with_retry(&policy(0), || {
            calls.set(calls.get() + 1);
            async { Err(EngineError::Unavailable { command: EngineCommand::Cancel }) }
        })
        .await;
        assert_eq!(calls.get(), 1);
    }
}
