//! Backoff for relayer HTTP calls.
//!
//! The relayer fronts a KMS quorum and answers 502, 503 or 504 while the
//! quorum is unavailable. Those statuses are retried like transport
//! failures. Every other response goes back to the caller on first sight,
//! and the last response is returned as is once attempts run out.

use std::time::Duration;

use reqwest::StatusCode;

/// Attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles each time (200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Whether a relayer status means "try again later".
pub(crate) fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Send a relayer request, retrying transport errors and transient
/// statuses. `send` is called at most `MAX_RETRIES + 1` times.
pub(crate) async fn send_with_retry<F, Fut>(send: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let outcome = send().await;
        let reason = match &outcome {
            Ok(resp) if is_transient(resp.status()) => Some(format!("relayer answered {}", resp.status())),
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        let Some(reason) = reason.filter(|_| attempt < MAX_RETRIES) else {
            return outcome;
        };

        let delay = Duration::from_millis(BASE_DELAY_MS << attempt);
        attempt += 1;
        tracing::warn!(attempt, max_retries = MAX_RETRIES, ?delay, "{reason}, retrying");
        tokio::time::sleep(delay).await;
    }
}
