pub mod hub;
pub mod mock;
pub mod vision;

pub use hub::HomeAssistantClient;
pub use vision::GeminiAnalyzer;

use std::time::Duration;

use tidy_core::ServiceError;

/// Classify a transport-level reqwest failure.
pub(crate) fn transport_error(e: reqwest::Error, timeout: Duration) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout(timeout)
    } else if e.is_decode() {
        ServiceError::Malformed(e.to_string())
    } else {
        ServiceError::Unreachable(e.to_string())
    }
}

/// Pass successful responses through, turn the rest into `ServiceError`.
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ServiceError::from_status(status, body))
}
