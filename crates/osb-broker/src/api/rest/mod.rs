//! REST API: router, version gate, handlers and shared state

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
