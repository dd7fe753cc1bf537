//! Catalog handler

use crate::api::rest::state::AppState;
use crate::error::BrokerResponse;
use axum::extract::State;
use osb_types::CatalogResponse;

/// List the services and plans on offer
pub async fn get_catalog(State(state): State<AppState>) -> BrokerResponse<CatalogResponse> {
    state.broker.catalog()
}
