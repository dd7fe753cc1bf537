//! Provision, deprovision and last_operation

use axum::http::StatusCode;
use osb_store::StoreError;
use osb_types::{
    DeprovisionResponse, LastOperationResponse, LastOperationState, Operation,
    ProvisionRequest, ProvisionResponse, ServiceInstance, ServiceInstanceSpec,
};

use super::BrokerOperations;
use crate::error::{BrokerError, BrokerResponse};

impl BrokerOperations {
    pub(super) async fn provision_instance(
        &self,
        instance_id: &str,
        request: ProvisionRequest,
    ) -> BrokerResponse<ProvisionResponse> {
        if !request.accepts_incomplete {
            return BrokerResponse::error(StatusCode::UNPROCESSABLE_ENTITY, BrokerError::AsyncRequired);
        }

        let spec = ServiceInstanceSpec {
            service_id: request.service_id,
            plan_id: request.plan_id,
            parameters: request.parameters,
            credential: uuid::Uuid::new_v4().to_string(),
        };
        let instance = ServiceInstance::new(self.namespace.clone(), instance_id, spec);

        let mut retried = false;
        loop {
            let existing = match self.store.create(instance.clone()).await {
                Ok(created) => {
                    tracing::info!(
                        instance_id = %instance_id,
                        service_id = %created.spec.service_id,
                        plan_id = %created.spec.plan_id,
                        resource_version = created.resource_version(),
                        "Recorded instance for provisioning"
                    );
                    return BrokerResponse::ok(
                        StatusCode::ACCEPTED,
                        ProvisionResponse::in_flight(Operation::Provisioning),
                    );
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    self.store.get(&self.namespace, instance_id).await
                }
                Err(e) => {
                    tracing::error!(instance_id = %instance_id, error = %e, "Failed to record instance");
                    return BrokerResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e);
                }
            };

            match existing {
                Ok(existing) => return answer_duplicate(instance_id, &existing, &instance.spec),
                // Deleted between the create and the read
                Err(e) if e.is_not_found() && !retried => retried = true,
                Err(e) if e.is_not_found() => {
                    tracing::warn!(instance_id = %instance_id, "Instance vanished twice during provision");
                    return BrokerResponse::error(
                        StatusCode::CONFLICT,
                        BrokerError::Conflict(format!(
                            "service instance {} was modified concurrently",
                            instance_id
                        )),
                    );
                }
                Err(e) => {
                    tracing::error!(instance_id = %instance_id, error = %e, "Failed to read existing instance");
                    return BrokerResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e);
                }
            }
        }
    }

    pub(super) async fn deprovision_instance(
        &self,
        instance_id: &str,
    ) -> BrokerResponse<DeprovisionResponse> {
        match self.store.delete(&self.namespace, instance_id).await {
            Ok(()) => {
                tracing::info!(instance_id = %instance_id, "Deleted instance");
                BrokerResponse::ok(
                    StatusCode::ACCEPTED,
                    DeprovisionResponse {
                        operation: Some(Operation::Deprovisioning),
                    },
                )
            }
            Err(e) if e.is_not_found() => {
                BrokerResponse::ok(StatusCode::GONE, DeprovisionResponse::default())
            }
            Err(e) => {
                tracing::error!(instance_id = %instance_id, error = %e, "Failed to delete instance");
                BrokerResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        }
    }

    pub(super) async fn instance_last_operation(
        &self,
        instance_id: &str,
        operation: Operation,
    ) -> BrokerResponse<LastOperationResponse> {
        if operation == Operation::Updating {
            return BrokerResponse::error(StatusCode::BAD_REQUEST, BrokerError::InvalidOperation);
        }

        let instance = match self.store.get(&self.namespace, instance_id).await {
            Ok(instance) => instance,
            Err(e) if e.is_not_found() && operation == Operation::Deprovisioning => {
                return BrokerResponse::ok(StatusCode::GONE, LastOperationResponse::default());
            }
            Err(e) if e.is_not_found() => {
                return BrokerResponse::error(StatusCode::BAD_REQUEST, e);
            }
            Err(e) => {
                tracing::error!(instance_id = %instance_id, error = %e, "Failed to read instance");
                return BrokerResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e);
            }
        };

        // Deletes complete synchronously, so a live instance never has a
        // deprovision in flight
        if operation == Operation::Deprovisioning {
            return BrokerResponse::error(StatusCode::BAD_REQUEST, BrokerError::InvalidOperation);
        }

        let state = LastOperationState::from_conditions(&instance.status.conditions);

        tracing::debug!(
            instance_id = %instance_id,
            operation = %operation,
            state = ?state,
            "Reported last operation"
        );
        BrokerResponse::ok(StatusCode::OK, LastOperationResponse::new(state))
    }
}

/// Answer a provision for an id that is already taken
fn answer_duplicate(
    instance_id: &str,
    existing: &ServiceInstance,
    requested: &ServiceInstanceSpec,
) -> BrokerResponse<ProvisionResponse> {
    if !existing
        .spec
        .matches(&requested.service_id, &requested.plan_id, &requested.parameters)
    {
        tracing::warn!(instance_id = %instance_id, "Provision conflicts with existing instance");
        return BrokerResponse::error(
            StatusCode::CONFLICT,
            BrokerError::Conflict(format!(
                "service instance {} already exists with different attributes",
                instance_id
            )),
        );
    }

    if existing.is_ready() {
        BrokerResponse::ok(StatusCode::OK, ProvisionResponse::default())
    } else {
        BrokerResponse::ok(
            StatusCode::ACCEPTED,
            ProvisionResponse::in_flight(Operation::Provisioning),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::FakeStore;
    use crate::operations::{Broker, BrokerOperations};
    use chrono::Utc;
    use osb_store::InstanceStore;
    use osb_types::{ConditionType, ServiceInstanceCondition};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    const NS: &str = "brokersdk";

    fn setup() -> (Arc<FakeStore>, BrokerOperations) {
        let store = Arc::new(FakeStore::new());
        let ops = BrokerOperations::new(store.clone(), NS);
        (store, ops)
    }

    fn async_request() -> ProvisionRequest {
        ProvisionRequest {
            service_id: "serviceUUID".into(),
            plan_id: "gold_plan_id".into(),
            accepts_incomplete: true,
            ..Default::default()
        }
    }

    async fn mark(store: &FakeStore, name: &str, condition_type: ConditionType) {
        let mut si = store.inner().get(NS, name).await.unwrap();
        si.push_condition(ServiceInstanceCondition::truthy(
            condition_type,
            Utc::now(),
            "Test",
            "set by test",
        ));
        store.inner().update(si).await.unwrap();
    }

    #[tokio::test]
    async fn test_provision_records_instance() {
        let (store, ops) = setup();
        let resp = ops.provision("abc-123", async_request()).await;

        assert_eq!(resp.status, StatusCode::ACCEPTED);
        assert_eq!(resp.body.unwrap().operation, Some(Operation::Provisioning));

        let stored = store.inner().get(NS, "abc-123").await.unwrap();
        assert_eq!(stored.spec.service_id, "serviceUUID");
        assert_eq!(stored.spec.plan_id, "gold_plan_id");
        assert!(uuid::Uuid::parse_str(&stored.spec.credential).is_ok());
        assert!(stored.status.conditions.is_empty());
    }

    #[tokio::test]
    async fn test_provision_without_async_never_writes() {
        let (store, ops) = setup();
        let resp = ops
            .provision(
                "abc-123",
                ProvisionRequest {
                    accepts_incomplete: false,
                    ..async_request()
                },
            )
            .await;

        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(matches!(resp.body, Err(BrokerError::AsyncRequired)));
        assert_eq!(store.count("create"), 0);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provision_store_failure_is_500() {
        let (store, ops) = setup();
        store.fail("create", StoreError::Backend("disk full".into()));

        let resp = ops.provision("abc-123", async_request()).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.body.unwrap_err().to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_duplicate_identical_provision_in_flight_is_202() {
        let (_store, ops) = setup();
        ops.provision("abc-123", async_request()).await;

        let resp = ops.provision("abc-123", async_request()).await;
        assert_eq!(resp.status, StatusCode::ACCEPTED);
        assert_eq!(resp.body.unwrap().operation, Some(Operation::Provisioning));
    }

    #[tokio::test]
    async fn test_duplicate_identical_provision_ready_is_200() {
        let (store, ops) = setup();
        ops.provision("abc-123", async_request()).await;
        mark(&store, "abc-123", ConditionType::Ready).await;

        let resp = ops.provision("abc-123", async_request()).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body.unwrap().operation, None);
    }

    #[tokio::test]
    async fn test_duplicate_identical_provision_failed_is_202() {
        let (store, ops) = setup();
        ops.provision("abc-123", async_request()).await;
        mark(&store, "abc-123", ConditionType::Failed).await;

        let resp = ops.provision("abc-123", async_request()).await;
        assert_eq!(resp.status, StatusCode::ACCEPTED);
        assert_eq!(resp.body.unwrap().operation, Some(Operation::Provisioning));

        let poll = ops.last_operation("abc-123", Operation::Provisioning).await;
        assert_eq!(poll.body.unwrap().state, Some(LastOperationState::Failed));
    }

    #[tokio::test]
    async fn test_provision_retries_when_existing_instance_vanishes() {
        let (store, ops) = setup();
        // The name looked taken, but the instance was gone by the read
        store.fail_once("create", StoreError::already_exists(NS, "abc-123"));

        let resp = ops.provision("abc-123", async_request()).await;
        assert_eq!(resp.status, StatusCode::ACCEPTED);
        assert_eq!(store.count("create"), 2);
        assert!(store.inner().get(NS, "abc-123").await.is_ok());
    }

    #[tokio::test]
    async fn test_provision_gives_up_after_second_vanish() {
        let (store, ops) = setup();
        ops.provision("abc-123", async_request()).await;
        store.fail("get", StoreError::not_found(NS, "abc-123"));

        let resp = ops.provision("abc-123", async_request()).await;
        assert_eq!(resp.status, StatusCode::CONFLICT);
        assert!(matches!(resp.body, Err(BrokerError::Conflict(_))));
        assert_eq!(store.count("create"), 3);
    }

    #[tokio::test]
    async fn test_duplicate_different_provision_is_409() {
        let (_store, ops) = setup();
        ops.provision("abc-123", async_request()).await;

        let mut params = BTreeMap::new();
        params.insert("size".to_string(), "large".to_string());
        let resp = ops
            .provision(
                "abc-123",
                ProvisionRequest {
                    parameters: params,
                    ..async_request()
                },
            )
            .await;
        assert_eq!(resp.status, StatusCode::CONFLICT);
        assert!(matches!(resp.body, Err(BrokerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_deprovision_then_gone() {
        let (_store, ops) = setup();
        ops.provision("abc-123", async_request()).await;

        let first = ops.deprovision("abc-123").await;
        assert_eq!(first.status, StatusCode::ACCEPTED);
        assert_eq!(
            first.body.unwrap().operation,
            Some(Operation::Deprovisioning)
        );

        let second = ops.deprovision("abc-123").await;
        assert_eq!(second.status, StatusCode::GONE);
        assert_eq!(second.body.unwrap(), DeprovisionResponse::default());
    }

    #[tokio::test]
    async fn test_deprovision_store_failure_is_500() {
        let (store, ops) = setup();
        store.fail("delete", StoreError::Closed);
        let resp = ops.deprovision("abc-123").await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_last_operation_tracks_conditions() {
        let (store, ops) = setup();
        ops.provision("pending", async_request()).await;
        ops.provision("done", async_request()).await;
        ops.provision("broken", async_request()).await;
        mark(&store, "done", ConditionType::Ready).await;
        mark(&store, "broken", ConditionType::Failed).await;

        for (name, expected) in [
            ("pending", LastOperationState::InProgress),
            ("done", LastOperationState::Succeeded),
            ("broken", LastOperationState::Failed),
        ] {
            let resp = ops.last_operation(name, Operation::Provisioning).await;
            assert_eq!(resp.status, StatusCode::OK);
            assert_eq!(resp.body.unwrap().state, Some(expected), "instance {}", name);
        }
    }

    #[tokio::test]
    async fn test_last_operation_updating_is_invalid() {
        let (store, ops) = setup();
        let resp = ops.last_operation("abc-123", Operation::Updating).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body.unwrap_err().to_string(), "invalid operation");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_last_operation_missing_instance() {
        let (_store, ops) = setup();

        let deprov = ops.last_operation("gone", Operation::Deprovisioning).await;
        assert_eq!(deprov.status, StatusCode::GONE);
        assert_eq!(deprov.body.unwrap(), LastOperationResponse::default());

        let prov = ops.last_operation("gone", Operation::Provisioning).await;
        assert_eq!(prov.status, StatusCode::BAD_REQUEST);
        assert!(prov.body.unwrap_err().to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_last_operation_deprovisioning_live_instance_is_invalid() {
        let (_store, ops) = setup();
        ops.provision("abc-123", async_request()).await;

        let resp = ops.last_operation("abc-123", Operation::Deprovisioning).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body.unwrap_err().to_string(), "invalid operation");
    }

    #[tokio::test]
    async fn test_last_operation_store_failure_is_500() {
        let (store, ops) = setup();
        store.fail("get", StoreError::Backend("timeout".into()));
        let resp = ops.last_operation("abc-123", Operation::Provisioning).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
