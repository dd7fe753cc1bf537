//! Built-in service catalog

use axum::http::StatusCode;
use osb_types::{CatalogResponse, Plan, Service};
use std::collections::BTreeMap;

use super::BrokerOperations;
use crate::error::BrokerResponse;

/// The single service offering with its single gold plan
pub fn static_catalog() -> CatalogResponse {
    let mut metadata = BTreeMap::new();
    metadata.insert(
        "metadata_key1".to_string(),
        serde_json::Value::String("metadata_value1".to_string()),
    );

    CatalogResponse {
        services: vec![Service {
            name: "service name".to_string(),
            id: "serviceUUID".to_string(),
            description: "service description".to_string(),
            tags: vec!["tag1".to_string(), "tag2".to_string()],
            requires: Vec::new(),
            bindable: true,
            metadata,
            dashboard_client: None,
            plan_updateable: false,
            plans: vec![Plan {
                id: "gold_plan_id".to_string(),
                name: "gold plan".to_string(),
                description: "gold plan description".to_string(),
                metadata: BTreeMap::new(),
                free: true,
                bindable: true,
            }],
        }],
    }
}

impl BrokerOperations {
    pub(super) fn get_catalog(&self) -> BrokerResponse<CatalogResponse> {
        BrokerResponse::ok(StatusCode::OK, self.catalog.clone())
    }
}
