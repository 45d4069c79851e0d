//! Retry loop with linear backoff
//!
//! One policy drives both chunk uploads and plain API requests. Retryable
//! failures are transient transport faults and HTTP 5xx / 429 / 408; any
//! other 4xx is terminal and consumes no retry. The wait before retry `n`
//! is `base_sleep * n` plus up to 100ms of jitter.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{ConnectError, Result};
use crate::jsonapi;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Upper bound on backoff jitter.
const JITTER_MAX: Duration = Duration::from_millis(100);

/// Whether an HTTP status is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 429 || status == 408
}

/// Backoff before retry `attempt` (1-based): `base_sleep * attempt` plus
/// uniform jitter in `[0, 100ms)`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(Duration::ZERO..JITTER_MAX);
    policy.base_sleep * attempt + jitter
}

/// Issue `request` through `transport`, retrying per `policy`.
///
/// Returns the response on any 2xx. A terminal client error returns
/// immediately; a retryable failure is re-attempted up to
/// `policy.max_retries` times, after which the last error surfaces as a
/// typed failure. The attempt count is `max_retries + 1` in the worst case.
pub async fn send_with_retry(
    transport: &dyn HttpTransport,
    policy: &RetryPolicy,
    request: &HttpRequest,
) -> Result<HttpResponse> {
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let error = match transport.execute(request.clone()).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => {
                let error = response_error(&response);
                if !is_retryable_status(response.status) {
                    debug!(
                        status = response.status,
                        "terminal response, not retrying"
                    );
                    return Err(error);
                }
                error
            }
            Err(fault) if fault.is_transient() => ConnectError::Transport(fault),
            Err(fault) => return Err(ConnectError::Transport(fault)),
        };

        if attempt > policy.max_retries {
            return Err(error);
        }

        let delay = backoff_delay(policy, attempt);
        warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            "retrying after {error}"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Map a non-2xx response to a typed API error, preferring the JSON:API
/// error body's detail when the server sent one.
pub fn response_error(response: &HttpResponse) -> ConnectError {
    let message = jsonapi::parse_error_body(&response.body)
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).to_string());
    ConnectError::Api {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;
    use crate::transport::{FaultKind, Method, TransportFault};

    fn ok(status: u16) -> std::result::Result<HttpResponse, TransportFault> {
        Ok(HttpResponse {
            status,
            body: Vec::new(),
        })
    }

    fn reset() -> std::result::Result<HttpResponse, TransportFault> {
        Err(TransportFault::new(
            FaultKind::ConnectionReset,
            "connection reset by peer",
        ))
    }

    fn request() -> HttpRequest {
        HttpRequest::new(Method::Put, "https://upload.example/part")
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_secs(1))
    }

    #[test]
    fn status_classification() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(408));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn backoff_is_linear_with_bounded_jitter() {
        let policy = policy(5);
        for attempt in 1..=5u32 {
            let delay = backoff_delay(&policy, attempt);
            let base = Duration::from_secs(attempt as u64);
            assert!(delay >= base, "attempt {attempt}: {delay:?} < {base:?}");
            assert!(
                delay < base + JITTER_MAX,
                "attempt {attempt}: {delay:?} out of jitter bound"
            );
        }
    }

    #[tokio::test]
    async fn success_consumes_no_retries() {
        let transport = ScriptedTransport::new(vec![ok(200)]);
        let response = send_with_retry(&transport, &policy(3), &request())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_from_transient_resets() {
        let transport = ScriptedTransport::new(vec![reset(), reset(), ok(201)]);
        let response = send_with_retry(&transport, &policy(3), &request())
            .await
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_503_exhausts_max_retries_plus_one_attempts() {
        let transport = ScriptedTransport::new(vec![ok(503), ok(503), ok(503), ok(503)]);
        let error = send_with_retry(&transport, &policy(3), &request())
            .await
            .unwrap_err();
        assert_eq!(transport.attempts(), 4);
        assert_eq!(error.status(), Some(503));
    }

    #[tokio::test]
    async fn terminal_404_fails_on_first_attempt() {
        let transport = ScriptedTransport::new(vec![ok(404)]);
        let error = send_with_retry(&transport, &policy(3), &request())
            .await
            .unwrap_err();
        assert_eq!(transport.attempts(), 1);
        assert_eq!(error.status(), Some(404));
    }

    #[tokio::test]
    async fn zero_retry_policy_is_single_shot() {
        let transport = ScriptedTransport::new(vec![ok(503)]);
        let error = send_with_retry(&transport, &RetryPolicy::default(), &request())
            .await
            .unwrap_err();
        assert_eq!(transport.attempts(), 1);
        assert_eq!(error.status(), Some(503));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_and_request_timeout_are_retryable() {
        let transport = ScriptedTransport::new(vec![ok(429), ok(408), ok(200)]);
        let response = send_with_retry(&transport, &policy(2), &request())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test]
    async fn non_transient_fault_is_terminal() {
        let transport = ScriptedTransport::new(vec![Err(TransportFault::new(
            FaultKind::Other,
            "certificate has been revoked",
        ))]);
        let error = send_with_retry(&transport, &policy(3), &request())
            .await
            .unwrap_err();
        assert_eq!(transport.attempts(), 1);
        assert!(matches!(error, ConnectError::Transport(_)));
    }
}
