//! Service instance handlers

use crate::api::rest::handlers::parse_body;
use crate::api::rest::state::AppState;
use crate::error::{BrokerError, BrokerResponse};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use osb_types::{
    validate_uuid, DeprovisionResponse, FieldError, LastOperationResponse, Operation,
    ProvisionRequest, ProvisionResponse,
};
use serde::Deserialize;

/// Query parameters of a deprovision call
#[derive(Debug, Default, Deserialize)]
pub struct DeprovisionQuery {
    pub accepts_incomplete: Option<String>,
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
}

/// Query parameters of a last_operation poll
#[derive(Debug, Default, Deserialize)]
pub struct LastOperationQuery {
    pub operation: Option<String>,
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
}

/// Provision a service instance
pub async fn provision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    body: Bytes,
) -> BrokerResponse<ProvisionResponse> {
    let request: ProvisionRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return BrokerResponse::error(StatusCode::BAD_REQUEST, e),
    };

    if !request.accepts_incomplete {
        return BrokerResponse::error(StatusCode::UNPROCESSABLE_ENTITY, BrokerError::AsyncRequired);
    }

    if let Err(errors) = validate_uuid("instance_id", &instance_id).into_result() {
        return BrokerResponse::error(StatusCode::BAD_REQUEST, errors);
    }

    state.broker.provision(&instance_id, request).await
}

/// Deprovision a service instance
pub async fn deprovision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<DeprovisionQuery>,
) -> BrokerResponse<DeprovisionResponse> {
    if query.accepts_incomplete.as_deref() != Some("true") {
        return BrokerResponse::error(StatusCode::UNPROCESSABLE_ENTITY, BrokerError::AsyncRequired);
    }

    if let Err(errors) = validate_uuid("instance_id", &instance_id).into_result() {
        return BrokerResponse::error(StatusCode::BAD_REQUEST, errors);
    }

    state.broker.deprovision(&instance_id).await
}

/// Poll the last asynchronous operation on an instance
pub async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> BrokerResponse<LastOperationResponse> {
    let mut errors = validate_uuid("instance_id", &instance_id);

    let raw_operation = query.operation.unwrap_or_default();
    let operation = match raw_operation.parse::<Operation>() {
        Ok(op) => Some(op),
        Err(_) => {
            errors.push(FieldError {
                field: "operation".to_string(),
                value: raw_operation,
                detail: "must be one of provisioning, updating, deprovisioning".to_string(),
            });
            None
        }
    };

    match (errors.into_result(), operation) {
        (Ok(()), Some(operation)) => state.broker.last_operation(&instance_id, operation).await,
        (Err(errors), _) => BrokerResponse::error(StatusCode::BAD_REQUEST, errors),
        (Ok(()), None) => BrokerResponse::error(StatusCode::BAD_REQUEST, BrokerError::InvalidOperation),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::rest::router::tests::{call, test_router, FakeBroker, INSTANCE};
    use axum::http::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_provision_accepted() {
        let broker = Arc::new(FakeBroker::default());
        let (status, body) = call(
            test_router(broker.clone()),
            "PUT",
            &format!("/service_instances/{}", INSTANCE),
            Some(r#"{"service_id":"serviceUUID","plan_id":"gold_plan_id","accepts_incomplete":true}"#),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["operation"], "provisioning");
        assert_eq!(broker.calls(), vec![format!("provision {}", INSTANCE)]);
    }

    #[tokio::test]
    async fn test_provision_without_async_is_422_and_skips_facade() {
        let broker = Arc::new(FakeBroker::default());
        let (status, body) = call(
            test_router(broker.clone()),
            "PUT",
            &format!("/service_instances/{}", INSTANCE),
            Some(r#"{"service_id":"serviceUUID","plan_id":"gold_plan_id"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "AsyncRequired");
        assert!(broker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provision_async_check_precedes_id_check() {
        let broker = Arc::new(FakeBroker::default());
        let (status, _) = call(
            test_router(broker),
            "PUT",
            "/service_instances/not-a-uuid",
            Some(r#"{"accepts_incomplete":false}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_provision_bad_id_is_400() {
        let broker = Arc::new(FakeBroker::default());
        let (status, body) = call(
            test_router(broker.clone()),
            "PUT",
            "/service_instances/abc-123",
            Some(r#"{"accepts_incomplete":true}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["description"],
            r#"instance_id: Invalid value: "abc-123": must be a valid UUID"#
        );
        assert!(broker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provision_rejects_alternate_uuid_spellings() {
        let broker = Arc::new(FakeBroker::default());
        for id in [
            "6b1b4d7e5d0c4f4e9a555f5a6f3f0b11",
            "{6b1b4d7e-5d0c-4f4e-9a55-5f5a6f3f0b12}",
        ] {
            let (status, body) = call(
                test_router(broker.clone()),
                "PUT",
                &format!("/service_instances/{}", id),
                Some(r#"{"accepts_incomplete":true}"#),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "id {}", id);
            assert!(body["description"]
                .as_str()
                .unwrap()
                .contains("must be a valid UUID"));
        }
        assert!(broker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provision_malformed_body_is_400() {
        let broker = Arc::new(FakeBroker::default());
        let (status, body) = call(
            test_router(broker.clone()),
            "PUT",
            &format!("/service_instances/{}", INSTANCE),
            Some("{not json"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["description"].is_string());
        assert!(broker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deprovision_requires_accepts_incomplete() {
        let broker = Arc::new(FakeBroker::default());
        let uri = format!("/service_instances/{}", INSTANCE);

        let (status, _) = call(test_router(broker.clone()), "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            test_router(broker.clone()),
            "DELETE",
            &format!("{}?accepts_incomplete=false", uri),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(broker.calls().is_empty());

        let (status, body) = call(
            test_router(broker.clone()),
            "DELETE",
            &format!("{}?accepts_incomplete=true", uri),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["operation"], "deprovisioning");
    }

    #[tokio::test]
    async fn test_deprovision_bad_id_is_400() {
        let broker = Arc::new(FakeBroker::default());
        let (status, _) = call(
            test_router(broker.clone()),
            "DELETE",
            "/service_instances/nope?accepts_incomplete=true",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(broker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_last_operation_validates_operation() {
        let broker = Arc::new(FakeBroker::default());
        let base = format!("/service_instances/{}/last_operation", INSTANCE);

        let (status, _) = call(test_router(broker.clone()), "GET", &base, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            test_router(broker.clone()),
            "GET",
            &format!("{}?operation=binding", base),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(broker.calls().is_empty());

        let (status, body) = call(
            test_router(broker.clone()),
            "GET",
            &format!("{}?operation=provisioning", base),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "in progress");
    }

    #[tokio::test]
    async fn test_last_operation_aggregates_violations() {
        let broker = Arc::new(FakeBroker::default());
        let (status, body) = call(
            test_router(broker),
            "GET",
            "/service_instances/bad/last_operation?operation=bogus",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let description = body["description"].as_str().unwrap();
        assert!(description.starts_with('['));
        assert!(description.contains("instance_id"));
        assert!(description.contains("operation"));
    }
}
