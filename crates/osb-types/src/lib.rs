//! OSB Types - Wire protocol and instance model for the service broker
//!
//! This crate holds the types shared by every layer of the broker:
//!
//! - **protocol**: request/response bodies of the Open Service Broker API
//!   (catalog, provision, bind, last operation, error bodies) and the
//!   `X-Broker-Api-Version` negotiation rules
//! - **instance**: the `ServiceInstance` record persisted by the store and
//!   advanced by the reconciliation controller through its conditions
//! - **validation**: identifier checks whose failures aggregate into a single
//!   field error list
//!
//! ## Key Concepts
//!
//! - **ServiceInstance**: the only persisted entity; its spec is immutable
//!   after creation and its status is an append-only condition history
//! - **Condition**: a timestamped `Ready`/`Failed` fact with a tri-state status
//! - **Operation**: the token a platform polls with (`provisioning`,
//!   `updating`, `deprovisioning`)

#![deny(unsafe_code)]

pub mod instance;
pub mod protocol;
pub mod validation;

pub use instance::{
    ConditionStatus, ConditionType, ObjectMeta, ServiceInstance, ServiceInstanceCondition,
    ServiceInstanceSpec, ServiceInstanceStatus,
};
pub use protocol::{
    ApiVersion, BindRequest, BindResource, BindResponse, CatalogResponse, DashboardClient,
    DeprovisionResponse, ErrorResponse, LastOperationResponse, LastOperationState, Operation,
    ParseOperationError, Plan, PlatformContext, ProvisionRequest, ProvisionResponse, Service,
    UnbindResponse, API_VERSION, ASYNC_REQUIRED_DESCRIPTION, ASYNC_REQUIRED_ERROR,
    MIN_API_VERSION, X_BROKER_API_VERSION,
};
pub use validation::{validate_uuid, FieldError, FieldErrors};
