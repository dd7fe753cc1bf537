//! Backing resource hooks

use async_trait::async_trait;
use osb_types::ServiceInstance;
use thiserror::Error;

/// Provisioning work failed permanently
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProvisionError(pub String);

/// Performs the real work behind an instance.
///
/// `provision` runs once per instance that has not yet settled; it may be
/// retried after a failed status write, so it must tolerate repeats.
/// `release` runs when the controller observes the instance's deletion.
#[async_trait]
pub trait Provisioner: Send + Sync + 'static {
    async fn provision(&self, instance: &ServiceInstance) -> Result<(), ProvisionError>;

    async fn release(&self, instance: &ServiceInstance) -> Result<(), ProvisionError>;
}

/// Provisions nothing and always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisioner;

#[async_trait]
impl Provisioner for NoopProvisioner {
    async fn provision(&self, _instance: &ServiceInstance) -> Result<(), ProvisionError> {
        Ok(())
    }

    async fn release(&self, _instance: &ServiceInstance) -> Result<(), ProvisionError> {
        Ok(())
    }
}
