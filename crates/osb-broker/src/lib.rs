//! OSB Broker - Open Service Broker daemon
//!
//! This crate provides the broker's three layers:
//! - Protocol layer: axum routes, version negotiation, request validation
//! - Operations facade: broker verbs mapped onto the instance store
//! - Reconciliation controller: drives recorded instances to Ready or Failed
//!
//! plus configuration and server lifecycle management for the `osbd` binary.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod operations;
pub mod server;

pub use api::{create_router, AppState};
pub use config::BrokerConfig;
pub use controller::{Controller, NoopProvisioner, ProvisionError, Provisioner, Reconciled};
pub use error::{BrokerError, BrokerResponse, DaemonError, DaemonResult};
pub use operations::{static_catalog, Broker, BrokerOperations};
pub use server::Server;
