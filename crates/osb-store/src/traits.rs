//! Store trait definitions

use async_trait::async_trait;
use osb_types::ServiceInstance;
use tokio::sync::mpsc;

use crate::error::StoreResult;

/// A change observed on the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Added(ServiceInstance),
    Modified(ServiceInstance),
    Deleted(ServiceInstance),
}

impl StoreEvent {
    /// The instance snapshot carried by the event
    pub fn instance(&self) -> &ServiceInstance {
        match self {
            StoreEvent::Added(si) | StoreEvent::Modified(si) | StoreEvent::Deleted(si) => si,
        }
    }
}

/// Result of a list call: every live object plus the store version at the
/// time of the read.
#[derive(Debug, Clone, Default)]
pub struct InstanceList {
    pub items: Vec<ServiceInstance>,
    pub resource_version: u64,
}

/// Durable keyed storage for service instances.
///
/// ## Optimistic concurrency
///
/// Every persisted object carries `metadata.resource_version`. `update`
/// succeeds only when the version on the submitted object equals the stored
/// one, and returns `StoreError::Conflict` otherwise. Writers re-read and
/// retry; there is no in-process locking across calls.
///
/// ## Watch
///
/// `watch` yields changes made after the call. The channel closes when the
/// subscriber falls too far behind or the backend drops the connection;
/// callers resubscribe and relist to recover.
///
/// Implementations must be `Send + Sync + 'static` to be shared between the
/// HTTP handlers and the controller task.
#[async_trait]
pub trait InstanceStore: Send + Sync + 'static {
    /// Read one instance.
    ///
    /// Returns `Err(StoreError::NotFound)` if it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<ServiceInstance>;

    /// Persist a new instance and return it with its assigned version.
    ///
    /// Returns `Err(StoreError::AlreadyExists)` if the name is taken.
    async fn create(&self, instance: ServiceInstance) -> StoreResult<ServiceInstance>;

    /// Replace an existing instance (version-checked).
    async fn update(&self, instance: ServiceInstance) -> StoreResult<ServiceInstance>;

    /// Remove an instance.
    ///
    /// Returns `Err(StoreError::NotFound)` if it does not exist.
    async fn delete(&self, namespace: &str, name: &str) -> StoreResult<()>;

    /// List every instance in the namespace
    async fn list(&self, namespace: &str) -> StoreResult<InstanceList>;

    /// Subscribe to changes in the namespace
    async fn watch(&self, namespace: &str) -> StoreResult<mpsc::Receiver<StoreEvent>>;
}
