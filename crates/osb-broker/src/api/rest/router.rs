//! API Router configuration

use super::handlers;
use super::middleware::{echo_api_version, json_errors, version_gate};
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the broker router.
///
/// Broker routes are mounted under `<url_prefix>/v2` and require a
/// supported `X-Broker-Api-Version`; `/healthz` is not versioned. Every
/// response carries the implemented API version, and every error response
/// has a JSON body.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let broker_routes = Router::new()
        .route("/catalog", get(handlers::get_catalog))
        .route(
            "/service_instances/:instance_id",
            put(handlers::provision).delete(handlers::deprovision),
        )
        .route(
            "/service_instances/:instance_id/last_operation",
            get(handlers::last_operation),
        )
        .route(
            "/service_instances/:instance_id/service_bindings/:binding_id",
            put(handlers::bind).delete(handlers::unbind),
        )
        .route_layer(middleware::from_fn(version_gate));

    let mut router = Router::new()
        .route("/healthz", get(handlers::health_check))
        .nest(&config.versioned_prefix(), broker_routes)
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn(json_errors))
        .layer(middleware::from_fn(echo_api_version))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}
