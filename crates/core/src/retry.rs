//! Retry mechanism with exponential backoff and jitter
//!
//! Every operation that touches the remote location or spawns the transfer
//! tool goes through [`retry_with_backoff`]. Exhausting the attempts returns
//! the last error unchanged, so callers still see what kind of failure it was.

use std::io::ErrorKind;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Retry a fallible async operation with exponential backoff
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation` - Async closure that returns `Result<T>`
/// * `is_retryable` - Closure that determines if an error should trigger retry
///
/// # Example
/// ```ignore
/// let result = retry_with_backoff(
///     &config,
///     || async { object.size().await },
///     |e| e.is_retryable(),
/// ).await;
/// ```
pub async fn retry_with_backoff<T, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    is_retryable: R,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    R: Fn(&Error) -> bool,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                if attempt >= config.max_attempts {
                    tracing::warn!(attempts = attempt, error = %e, "Giving up after retries");
                    return Err(e);
                }

                let backoff = calculate_backoff(config, attempt);
                tracing::debug!(
                    attempt = attempt,
                    backoff_ms = backoff.as_millis(),
                    error = %e,
                    "Retrying after transient error"
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Delay before the attempt after `attempt`: `initial * 2^(attempt-1)`,
/// capped at `max_backoff_ms`, plus up to the same amount again as jitter
fn calculate_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let doublings = attempt.saturating_sub(1).min(10);
    let capped_ms = config
        .initial_backoff_ms
        .saturating_mul(1u64 << doublings)
        .min(config.max_backoff_ms);
    Duration::from_millis(capped_ms.saturating_add(jitter_ms(capped_ms)))
}

/// Clock-derived jitter in `0..ceiling`
fn jitter_ms(ceiling: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or_default();
    nanos % ceiling.max(1)
}

/// Check if an error is retryable (transient)
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        // The tool may fail on a flaky link or a file changing mid-copy
        Error::Transfer { .. } => true,
        Error::Io(e) => !matches!(
            e.kind(),
            ErrorKind::NotFound
                | ErrorKind::PermissionDenied
                | ErrorKind::InvalidInput
                | ErrorKind::NotADirectory
        ),
        Error::InvalidQuery(_)
        | Error::Spawn { .. }
        | Error::UnsupportedOperation(_)
        | Error::Config(_) => false,
        Error::General(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout") || msg_lower.contains("temporary")
        }
    }
}

/// Builds a [`RetryConfig`] starting from the defaults
#[derive(Debug, Clone, Default)]
pub struct RetryBuilder {
    config: RetryConfig,
}

impl RetryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn initial_backoff_ms(mut self, ms: u64) -> Self {
        self.config.initial_backoff_ms = ms;
        self
    }

    pub fn max_backoff_ms(mut self, ms: u64) -> Self {
        self.config.max_backoff_ms = ms;
        self
    }

    pub fn build(self) -> RetryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let config = RetryBuilder::new()
            .initial_backoff_ms(100)
            .max_backoff_ms(10_000)
            .build();

        for (attempt, base) in [(1, 100), (2, 200), (3, 400)] {
            let delay = calculate_backoff(&config, attempt).as_millis();
            assert!(delay >= base && delay < 2 * base, "attempt {attempt}: {delay}ms");
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryBuilder::new()
            .max_attempts(10)
            .initial_backoff_ms(1000)
            .max_backoff_ms(5000)
            .build();

        // cap plus at most the same again in jitter
        assert!(calculate_backoff(&config, 10).as_millis() < 10_000);
    }

    #[test]
    fn test_backoff_with_huge_settings_saturates() {
        let config = RetryBuilder::new()
            .initial_backoff_ms(u64::MAX / 2)
            .max_backoff_ms(u64::MAX)
            .build();

        assert!(calculate_backoff(&config, 1).as_millis() >= u128::from(u64::MAX / 2));
        assert_eq!(
            calculate_backoff(&config, 11),
            Duration::from_millis(u64::MAX)
        );
    }

    fn transfer_error() -> Error {
        Error::Transfer {
            command: "rsync -av a b".to_string(),
            status: "exit status: 12".to_string(),
            output: "rsync error: error in rsync protocol data stream".to_string(),
        }
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&transfer_error()));
        assert!(is_retryable_error(&Error::Io(std::io::Error::new(
            ErrorKind::TimedOut,
            "stale handle"
        ))));
        assert!(is_retryable_error(&Error::Io(std::io::Error::other(
            "input/output error"
        ))));

        assert!(!is_retryable_error(&Error::Io(std::io::Error::new(
            ErrorKind::NotFound,
            "gone"
        ))));
        assert!(!is_retryable_error(&Error::InvalidQuery(
            "scheme must be rsync".to_string()
        )));
        assert!(!is_retryable_error(&Error::Spawn {
            program: "rsync".to_string(),
            source: std::io::Error::new(ErrorKind::NotFound, "no such file"),
        }));
    }

    #[test]
    fn test_retry_builder_overrides_defaults() {
        let config = RetryBuilder::new().max_attempts(5).build();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff_ms, RetryConfig::default().initial_backoff_ms);
        assert_eq!(config.max_backoff_ms, RetryConfig::default().max_backoff_ms);
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let config = RetryConfig::default();
        let mut calls = 0;

        let result = retry_with_backoff(
            &config,
            || {
                calls += 1;
                async { Ok::<_, Error>(42) }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failure() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1, // Fast for tests
            max_backoff_ms: 10,
        };
        let call_count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let call_count_clone = call_count.clone();

        let result = retry_with_backoff(
            &config,
            || {
                let cc = call_count_clone.clone();
                async move {
                    let count = cc.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    if count < 2 {
                        Err(transfer_error())
                    } else {
                        Ok(42)
                    }
                }
            },
            is_retryable_error,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 10,
        };
        let mut calls = 0;

        let result: Result<()> = retry_with_backoff(
            &config,
            || {
                calls += 1;
                async { Err(transfer_error()) }
            },
            is_retryable_error,
        )
        .await;

        // The last error comes back with its kind intact
        let err = result.unwrap_err();
        assert_eq!(
            err.transfer_output(),
            Some("rsync error: error in rsync protocol data stream")
        );
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_retry_non_retryable() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 10,
        };
        let mut calls = 0;

        let result: Result<()> = retry_with_backoff(
            &config,
            || {
                calls += 1;
                async { Err(Error::InvalidQuery("scheme must be rsync".to_string())) }
            },
            is_retryable_error,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1); // Should not retry
    }
}
