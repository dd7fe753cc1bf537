//! OSB Store - Instance record store for the service broker
//!
//! The broker persists every service instance through the [`InstanceStore`]
//! trait. A store provides strongly consistent reads, a monotonically
//! increasing version token per object and a watch stream of changes.
//!
//! - [`Scheme`]: explicit registry mapping persisted kinds to their codec,
//!   built once at start-up and handed to the stores that need it
//! - [`InMemoryInstanceStore`]: versioned, watchable store for development,
//!   tests and single-process deployments
//! - [`Informer`]: turns list + watch into an ordered channel of
//!   [`InstanceEvent`]s, with periodic full relists and resubscription after
//!   a dropped watch

#![deny(unsafe_code)]

mod error;
mod informer;
mod memory;
mod scheme;
mod traits;

pub use error::{StoreError, StoreResult};
pub use informer::{Informer, InstanceEvent};
pub use memory::InMemoryInstanceStore;
pub use scheme::{broker_scheme, Resource, Scheme};
pub use traits::{InstanceList, InstanceStore, StoreEvent};
