//! Fixed-delay retry for backend calls.
//!
//! Points are awarded at most once per purchase, so the relay makes a single
//! extra attempt after a fixed pause and then gives up. There is no outbox.

use std::future::Future;
use std::time::Duration;

use crate::error::RelayError;

/// Extra attempts made after the first failure.
pub const RELAY_MAX_RETRIES: u32 = 1;

/// Returns `true` for transport failures worth one more attempt.
///
/// **Retriable:** timeouts, connection failures and other request-level
/// errors, plus HTTP 5xx responses.
///
/// **Not retriable:** 4xx responses (including 401 for a bad token),
/// undecodable bodies, configuration errors and tag mismatches.
pub(crate) fn is_retriable(err: &RelayError) -> bool {
    match err {
        RelayError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        RelayError::Status { status, .. } => (500..600).contains(status),
        RelayError::Deserialize { .. }
        | RelayError::InvalidUrl(_)
        | RelayError::MissingToken
        | RelayError::TagMismatch { .. } => false,
    }
}

/// Runs `operation`, retrying up to `max_retries` times on transient errors
/// with a constant `delay_ms` pause before each retry.
pub(crate) async fn retry_with_delay<T, F, Fut>(
    max_retries: u32,
    delay_ms: u64,
    mut operation: F,
) -> Result<T, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "points backend transient error, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn server_error() -> RelayError {
        RelayError::Status {
            status: 503,
            url: "http://localhost/points/add".to_owned(),
        }
    }

    #[test]
    fn server_errors_are_retriable() {
        assert!(is_retriable(&server_error()));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&RelayError::Status {
            status: 401,
            url: "http://localhost/points/add".to_owned(),
        }));
        assert!(!is_retriable(&RelayError::MissingToken));
        assert!(!is_retriable(&RelayError::TagMismatch {
            expected: "a-21".to_owned(),
            actual: "b-20".to_owned(),
        }));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_delay(RELAY_MAX_RETRIES, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, RelayError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_delay(RELAY_MAX_RETRIES, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(server_error())
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_delay(RELAY_MAX_RETRIES, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(server_error())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "one attempt plus one retry");
        assert!(matches!(result, Err(RelayError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn connection_refused_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_delay(RELAY_MAX_RETRIES, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                let err = reqwest::Client::new()
                    .get("http://127.0.0.1:1")
                    .send()
                    .await
                    .unwrap_err();
                Err::<u32, _>(RelayError::Http(err))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_unauthorized() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_delay(RELAY_MAX_RETRIES, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(RelayError::Status {
                    status: 401,
                    url: "http://localhost/points/add".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
