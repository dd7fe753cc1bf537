//! Operations facade
//!
//! Maps each broker verb onto instance store calls and maps store outcomes
//! back onto protocol outcomes. The HTTP layer never talks to the store
//! directly; it only calls through the [`Broker`] trait.

mod bindings;
mod catalog;
mod instances;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::static_catalog;

use async_trait::async_trait;
use osb_store::InstanceStore;
use osb_types::{
    BindRequest, BindResponse, CatalogResponse, DeprovisionResponse, LastOperationResponse,
    Operation, ProvisionRequest, ProvisionResponse, UnbindResponse,
};
use std::sync::Arc;

use crate::error::BrokerResponse;

/// The broker verbs, as called by the protocol layer
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Static service and plan listing
    fn catalog(&self) -> BrokerResponse<CatalogResponse>;

    /// Record a new instance for the controller to provision
    async fn provision(
        &self,
        instance_id: &str,
        request: ProvisionRequest,
    ) -> BrokerResponse<ProvisionResponse>;

    /// Remove an instance
    async fn deprovision(&self, instance_id: &str) -> BrokerResponse<DeprovisionResponse>;

    /// Report progress of an asynchronous operation on an instance
    async fn last_operation(
        &self,
        instance_id: &str,
        operation: Operation,
    ) -> BrokerResponse<LastOperationResponse>;

    /// Hand out credentials for an instance
    async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        request: BindRequest,
    ) -> BrokerResponse<BindResponse>;

    /// Release a binding
    async fn unbind(&self, instance_id: &str, binding_id: &str) -> BrokerResponse<UnbindResponse>;
}

/// [`Broker`] backed by an [`InstanceStore`]
#[derive(Clone)]
pub struct BrokerOperations {
    store: Arc<dyn InstanceStore>,
    namespace: String,
    catalog: CatalogResponse,
}

impl BrokerOperations {
    /// Operations over instances kept in `namespace`, serving the built-in
    /// catalog
    pub fn new(store: Arc<dyn InstanceStore>, namespace: impl Into<String>) -> Self {
        Self::with_catalog(store, namespace, static_catalog())
    }

    pub fn with_catalog(
        store: Arc<dyn InstanceStore>,
        namespace: impl Into<String>,
        catalog: CatalogResponse,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            catalog,
        }
    }
}

#[async_trait]
impl Broker for BrokerOperations {
    fn catalog(&self) -> BrokerResponse<CatalogResponse> {
        self.get_catalog()
    }

    async fn provision(
        &self,
        instance_id: &str,
        request: ProvisionRequest,
    ) -> BrokerResponse<ProvisionResponse> {
        self.provision_instance(instance_id, request).await
    }

    async fn deprovision(&self, instance_id: &str) -> BrokerResponse<DeprovisionResponse> {
        self.deprovision_instance(instance_id).await
    }

    async fn last_operation(
        &self,
        instance_id: &str,
        operation: Operation,
    ) -> BrokerResponse<LastOperationResponse> {
        self.instance_last_operation(instance_id, operation).await
    }

    async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        request: BindRequest,
    ) -> BrokerResponse<BindResponse> {
        self.create_binding(instance_id, binding_id, request).await
    }

    async fn unbind(&self, instance_id: &str, binding_id: &str) -> BrokerResponse<UnbindResponse> {
        self.delete_binding(instance_id, binding_id)
    }
}
