//! HTTP surface of the broker

pub mod rest;

pub use rest::router::create_router;
pub use rest::state::AppState;
