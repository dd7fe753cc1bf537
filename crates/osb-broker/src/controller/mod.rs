//! Reconciliation controller
//!
//! Consumes the informer's ordered [`InstanceEvent`] channel and drives each
//! added instance to a terminal Ready or Failed condition. Relists redeliver
//! every live instance, so handling an `Added` event for a settled instance
//! is a no-op. A failed status write is logged and left for the next relist.

mod provisioner;
mod reconciler;

pub use provisioner::{NoopProvisioner, ProvisionError, Provisioner};
pub use reconciler::{
    complete, failed_condition, plan, ready_condition, Action, MESSAGE_PROVISIONED,
    REASON_PROVISIONED, REASON_PROVISION_FAILED,
};

use chrono::Utc;
use osb_store::{InstanceEvent, InstanceStore};
use osb_types::ServiceInstance;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// What handling one event amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The instance already carried a terminal condition
    AlreadySettled,
    /// Ready was recorded
    Ready,
    /// Failed was recorded
    Failed,
    /// The status write was rejected; the next relist retries
    WriteFailed,
    /// Backing resources of a deleted instance were released
    Released,
}

/// Drives instances from requested to settled
#[derive(Clone)]
pub struct Controller {
    store: Arc<dyn InstanceStore>,
    provisioner: Arc<dyn Provisioner>,
}

impl Controller {
    pub fn new(store: Arc<dyn InstanceStore>, provisioner: Arc<dyn Provisioner>) -> Self {
        Self { store, provisioner }
    }

    /// Process events in delivery order until the channel closes or
    /// `shutdown` flips to true
    pub async fn run(
        self,
        mut events: mpsc::Receiver<InstanceEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!("Controller started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle(event).await;
                }
            }
        }

        tracing::info!("Controller stopped");
    }

    /// Apply one event
    pub async fn handle(&self, event: InstanceEvent) -> Reconciled {
        match event {
            InstanceEvent::Added(instance) => self.on_added(instance).await,
            InstanceEvent::Deleted(instance) => self.on_deleted(instance).await,
        }
    }

    async fn on_added(&self, instance: ServiceInstance) -> Reconciled {
        if plan(&instance) == Action::Skip {
            tracing::trace!(instance_id = %instance.name(), "Instance already settled");
            return Reconciled::AlreadySettled;
        }

        let outcome = self.provisioner.provision(&instance).await;
        if let Err(e) = &outcome {
            tracing::warn!(instance_id = %instance.name(), error = %e, "Provisioning failed");
        }

        let name = instance.name().to_string();
        let updated = complete(instance, &outcome, Utc::now());

        match self.store.update(updated).await {
            Ok(stored) => {
                tracing::info!(
                    instance_id = %name,
                    resource_version = stored.resource_version(),
                    ready = outcome.is_ok(),
                    "Recorded provisioning outcome"
                );
                if outcome.is_ok() {
                    Reconciled::Ready
                } else {
                    Reconciled::Failed
                }
            }
            Err(e) => {
                tracing::error!(
                    instance_id = %name,
                    error = %e,
                    "Failed to record provisioning outcome, awaiting relist"
                );
                Reconciled::WriteFailed
            }
        }
    }

    async fn on_deleted(&self, instance: ServiceInstance) -> Reconciled {
        if let Err(e) = self.provisioner.release(&instance).await {
            tracing::warn!(instance_id = %instance.name(), error = %e, "Failed to release instance");
        } else {
            tracing::info!(instance_id = %instance.name(), "Released deleted instance");
        }
        Reconciled::Released
    }
}
