use serde::de::DeserializeOwned;

use crate::error::ServiceError;

pub(crate) fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> ServiceError {
    move |source| ServiceError::Transport { service, source }
}

/// Turns a non-2xx response into [`ServiceError::Status`] carrying the body text.
pub(crate) async fn ensure_success(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(service, status = %status, "request rejected");
    Err(ServiceError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let bytes = resp.bytes().await.map_err(transport(service))?;
    serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode {
        service,
        message: e.to_string(),
    })
}
