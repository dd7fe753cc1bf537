//! Bind and unbind
//!
//! Bindings are not persisted. Bind reads the instance and returns its
//! shared credential, so repeating it is harmless.

use axum::http::StatusCode;
use osb_types::{BindRequest, BindResponse, UnbindResponse};

use super::BrokerOperations;
use crate::error::BrokerResponse;

impl BrokerOperations {
    pub(super) async fn create_binding(
        &self,
        instance_id: &str,
        binding_id: &str,
        _request: BindRequest,
    ) -> BrokerResponse<BindResponse> {
        match self.store.get(&self.namespace, instance_id).await {
            Ok(instance) => {
                tracing::info!(
                    instance_id = %instance_id,
                    binding_id = %binding_id,
                    "Issued binding credentials"
                );
                BrokerResponse::ok(
                    StatusCode::CREATED,
                    BindResponse::with_credential(instance.spec.credential),
                )
            }
            Err(e) if e.is_not_found() => {
                BrokerResponse::ok(StatusCode::GONE, BindResponse::default())
            }
            Err(e) => {
                tracing::error!(instance_id = %instance_id, error = %e, "Failed to read instance for bind");
                BrokerResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        }
    }

    pub(super) fn delete_binding(
        &self,
        instance_id: &str,
        binding_id: &str,
    ) -> BrokerResponse<UnbindResponse> {
        tracing::debug!(instance_id = %instance_id, binding_id = %binding_id, "Unbind");
        BrokerResponse::ok(StatusCode::OK, UnbindResponse {})
    }
}
