//! Broker API version negotiation

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use osb_types::{ApiVersion, ErrorResponse, API_VERSION, X_BROKER_API_VERSION};

use crate::error::{BrokerError, BrokerResponse};

fn api_version_header() -> HeaderName {
    HeaderName::from_static("x-broker-api-version")
}

/// Reject requests whose `X-Broker-Api-Version` is missing, malformed or
/// outside the supported range with 412
pub async fn version_gate(request: Request, next: Next) -> Response {
    let raw = request
        .headers()
        .get(X_BROKER_API_VERSION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if raw
        .as_deref()
        .and_then(ApiVersion::parse)
        .is_some_and(|v| v.is_supported())
    {
        return next.run(request).await;
    }

    tracing::debug!(
        header = raw.as_deref().unwrap_or("<missing>"),
        path = %request.uri().path(),
        "Rejected unsupported broker API version"
    );
    BrokerResponse::<()>::error(
        StatusCode::PRECONDITION_FAILED,
        BrokerError::UnsupportedApiVersion,
    )
    .into_response()
}

/// Stamp the implemented API version on every response
pub async fn echo_api_version(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(api_version_header(), HeaderValue::from_static(API_VERSION));
    response
}

/// Largest framework rejection body carried over into a description
const MAX_REJECTION_BODY: usize = 64 * 1024;

/// Rewrite error responses produced outside the handlers (body limit,
/// extractor rejections, unmatched routes and methods) as JSON
/// `{description}` bodies
pub async fn json_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_REJECTION_BODY).await.unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes);
    let description = match text.trim() {
        "" => status.canonical_reason().unwrap_or("request failed").to_string(),
        text => text.to_string(),
    };

    let mut rewritten = (status, Json(ErrorResponse::described(description))).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewritten.headers_mut().append(name.clone(), value.clone());
        }
    }
    rewritten
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}
