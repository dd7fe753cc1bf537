//! Service binding handlers

use crate::api::rest::handlers::parse_body;
use crate::api::rest::state::AppState;
use crate::error::BrokerResponse;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use osb_types::{validate_uuid, BindRequest, BindResponse, FieldErrors, UnbindResponse};

fn validate_ids(instance_id: &str, binding_id: &str) -> Result<(), FieldErrors> {
    let mut errors = validate_uuid("instance_id", instance_id);
    errors.extend(validate_uuid("binding_id", binding_id));
    errors.into_result()
}

/// Bind to a service instance
pub async fn bind(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    body: Bytes,
) -> BrokerResponse<BindResponse> {
    if let Err(errors) = validate_ids(&instance_id, &binding_id) {
        return BrokerResponse::error(StatusCode::BAD_REQUEST, errors);
    }

    let request: BindRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return BrokerResponse::error(StatusCode::BAD_REQUEST, e),
    };

    state.broker.bind(&instance_id, &binding_id, request).await
}

/// Remove a binding
pub async fn unbind(
    State(state): State<AppState>,
    Path((instance_id, binding_id)): Path<(String, String)>,
) -> BrokerResponse<UnbindResponse> {
    if let Err(errors) = validate_ids(&instance_id, &binding_id) {
        return BrokerResponse::error(StatusCode::BAD_REQUEST, errors);
    }

    state.broker.unbind(&instance_id, &binding_id).await
}
