//! Retry logic for transient SOAP errors.
//!
//! Sonos answers 701/714/716 while a speaker is switching sources, which
//! happens a lot right after a Spotify Connect hand-off. Those faults and
//! request timeouts are retried with backoff; everything else fails fast.

use std::time::Duration;

use crate::sonos::soap::SoapResult;

/// Retry delays for transient SOAP errors (exponential backoff).
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Executes a SOAP operation, retrying transient failures.
///
/// # Arguments
/// * `action` - Action name for logging
/// * `operation` - Closure that performs the SOAP request
pub(crate) async fn with_retry<T, F, Fut>(action: &str, operation: F) -> SoapResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = SoapResult<T>>,
{
    with_retry_delays(action, &RETRY_DELAYS_MS, operation).await
}

async fn with_retry_delays<T, F, Fut>(
    action: &str,
    delays_ms: &[u64],
    mut operation: F,
) -> SoapResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = SoapResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(r) => return Ok(r),
            Err(e) if e.is_transient() && attempt < delays_ms.len() => {
                let delay_ms = delays_ms[attempt];
                attempt += 1;
                log::warn!(
                    "[Sonos] {} transient error: {} (retry {}/{} in {}ms)",
                    action,
                    e,
                    attempt,
                    delays_ms.len(),
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::soap::SoapError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn busy() -> SoapError {
        SoapError::Fault {
            code: Some(701),
            message: "Transition not available".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_faults_until_success() {
        let calls = AtomicUsize::new(0);
        let result = with_retry("Pause", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(busy())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_all_delays() {
        let calls = AtomicUsize::new(0);
        let result: SoapResult<()> = with_retry_delays("Next", &[1, 1], || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(busy()) }
        })
        .await;

        assert_eq!(result.unwrap_err().fault_code(), Some(701));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: SoapResult<()> = with_retry("Pause", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SoapError::Parse) }
        })
        .await;

        assert!(matches!(result, Err(SoapError::Parse)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
