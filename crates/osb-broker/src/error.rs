//! Error types for the broker

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use osb_store::StoreError;
use osb_types::{ErrorResponse, FieldErrors, MIN_API_VERSION, X_BROKER_API_VERSION};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by broker operations and request validation.
///
/// The `Display` text is what ends up in the `description` of the error body.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The client did not set `accepts_incomplete`
    #[error("{}", osb_types::ASYNC_REQUIRED_DESCRIPTION)]
    AsyncRequired,

    /// The polled operation is not one the broker reports on
    #[error("invalid operation")]
    InvalidOperation,

    /// Missing or unsupported `X-Broker-Api-Version` header
    #[error("{} header must >= {}", X_BROKER_API_VERSION, MIN_API_VERSION)]
    UnsupportedApiVersion,

    /// One or more request fields are malformed
    #[error("{0}")]
    Validation(FieldErrors),

    /// The request body could not be decoded
    #[error("{0}")]
    MalformedBody(String),

    /// An instance with the same id but different attributes already exists
    #[error("{0}")]
    Conflict(String),

    /// Any store failure the operation does not map to a protocol outcome
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BrokerError {
    /// Body rendered for this error
    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            BrokerError::AsyncRequired => ErrorResponse::async_required(),
            other => ErrorResponse::described(other.to_string()),
        }
    }
}

impl From<FieldErrors> for BrokerError {
    fn from(errors: FieldErrors) -> Self {
        BrokerError::Validation(errors)
    }
}

/// Outcome of a broker operation: a status code plus either a success body
/// or the error to describe.
///
/// The status always travels with the outcome because several protocol
/// results pair an empty success body with a non-2xx code (410 Gone).
#[derive(Debug)]
pub struct BrokerResponse<T> {
    pub status: StatusCode,
    pub body: Result<T, BrokerError>,
}

impl<T> BrokerResponse<T> {
    pub fn ok(status: StatusCode, body: T) -> Self {
        Self {
            status,
            body: Ok(body),
        }
    }

    pub fn error(status: StatusCode, error: impl Into<BrokerError>) -> Self {
        Self {
            status,
            body: Err(error.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for BrokerResponse<T> {
    fn into_response(self) -> Response {
        match self.body {
            Ok(body) => (self.status, Json(body)).into_response(),
            Err(e) => (self.status, Json(e.to_error_response())).into_response(),
        }
    }
}

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_async_required_renders_error_code() {
        let response =
            BrokerResponse::<()>::error(StatusCode::UNPROCESSABLE_ENTITY, BrokerError::AsyncRequired)
                .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_of(response).await;
        assert_eq!(body["error"], "AsyncRequired");
        assert_eq!(
            body["description"],
            "This service plan requires client support for asynchronous service operations."
        );
    }

    #[tokio::test]
    async fn test_other_errors_render_description_only() {
        let response =
            BrokerResponse::<()>::error(StatusCode::BAD_REQUEST, BrokerError::InvalidOperation)
                .into_response();
        let body = body_of(response).await;
        assert_eq!(body, serde_json::json!({"description": "invalid operation"}));
    }

    #[tokio::test]
    async fn test_store_error_message_passes_through() {
        let err = StoreError::Backend("connection refused".into());
        let response =
            BrokerResponse::<()>::error(StatusCode::INTERNAL_SERVER_ERROR, err).into_response();
        let body = body_of(response).await;
        assert_eq!(body["description"], "storage backend error: connection refused");
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let response =
            BrokerResponse::ok(StatusCode::GONE, serde_json::json!({})).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(body_of(response).await, serde_json::json!({}));
    }

    #[test]
    fn test_version_error_message() {
        assert_eq!(
            BrokerError::UnsupportedApiVersion.to_string(),
            "X-Broker-Api-Version header must >= 2.7"
        );
    }
}
