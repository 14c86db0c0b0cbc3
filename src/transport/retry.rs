// Retry logic with exponential backoff
//
// Only transient transport failures are retried. Quota errors return at once
// so a rate-limited upstream is not flooded.

use std::time::Duration;
use tokio::time::sleep;

use crate::errors::Result;

const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

/// Execute a function with exponential backoff retry logic
pub async fn with_retry<F, Fut, T>(f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < MAX_RETRIES => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
                tracing::warn!(
                    "Request failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt + 1,
                    MAX_RETRIES,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QrqcError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_transport_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(QrqcError::Transport("connection reset".into()))
            } else {
                Ok("reply")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "reply");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(QrqcError::Transport("down".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(QrqcError::QuotaExceeded { until: None })
        })
        .await;

        assert!(matches!(result, Err(QrqcError::QuotaExceeded { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
