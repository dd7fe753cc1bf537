//! Open Service Broker API bodies
//!
//! Request and response types exchanged with the platform, plus the
//! `X-Broker-Api-Version` negotiation rules. Field names follow the wire
//! format (snake_case JSON).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::instance::{ConditionStatus, ConditionType, ServiceInstanceCondition};

/// Header carrying the broker API version on requests and responses
pub const X_BROKER_API_VERSION: &str = "X-Broker-Api-Version";

/// Version the broker implements; echoed on every response
pub const API_VERSION: &str = "2.11";

/// Oldest client version accepted
pub const MIN_API_VERSION: ApiVersion = ApiVersion { major: 2, minor: 7 };

/// Error code of the async-required rejection body
pub const ASYNC_REQUIRED_ERROR: &str = "AsyncRequired";

/// Description of the async-required rejection body
pub const ASYNC_REQUIRED_DESCRIPTION: &str =
    "This service plan requires client support for asynchronous service operations.";

// ── Version negotiation ─────────────────────────────────────────────────────

/// A `major.minor` broker API version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    /// Parse a header value.
    ///
    /// Anything other than exactly two dot-separated components yields
    /// `None`; a non-numeric component reads as zero.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().splitn(3, '.');
        let major = parts.next()?;
        let minor = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            major: major.parse().unwrap_or(0),
            minor: minor.parse().unwrap_or(0),
        })
    }

    /// Same major version and at least the minimum minor version
    pub fn is_supported(&self) -> bool {
        self.major == MIN_API_VERSION.major && self.minor >= MIN_API_VERSION.minor
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ── Catalog ─────────────────────────────────────────────────────────────────

/// An available service listed in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    pub bindable: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_client: Option<DashboardClient>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub plan_updateable: bool,
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardClient {
    pub id: String,
    pub secret: String,
    pub redirect_uri: String,
}

/// A plan within a service offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub free: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bindable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub services: Vec<Service>,
}

// ── Operations and polling ──────────────────────────────────────────────────

/// Token distinguishing the asynchronous operation being polled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Provisioning,
    Updating,
    Deprovisioning,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Provisioning => "provisioning",
            Operation::Updating => "updating",
            Operation::Deprovisioning => "deprovisioning",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation {0:?}")]
pub struct ParseOperationError(pub String);

impl FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provisioning" => Ok(Operation::Provisioning),
            "updating" => Ok(Operation::Updating),
            "deprovisioning" => Ok(Operation::Deprovisioning),
            other => Err(ParseOperationError(other.to_string())),
        }
    }
}

/// Progress of the polled operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastOperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl LastOperationState {
    /// Derive the provisioning state from a condition history.
    ///
    /// Conditions are scanned oldest first, so a later terminal condition
    /// wins over an earlier one. No terminal condition means in progress.
    pub fn from_conditions(conditions: &[ServiceInstanceCondition]) -> Self {
        let mut state = LastOperationState::InProgress;
        for condition in conditions {
            if condition.status != ConditionStatus::True {
                continue;
            }
            match condition.condition_type {
                ConditionType::Ready => state = LastOperationState::Succeeded,
                ConditionType::Failed => state = LastOperationState::Failed,
            }
        }
        state
    }
}

/// Body of a last_operation response.
///
/// `state` is absent on the empty body returned with 410 Gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LastOperationState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LastOperationResponse {
    pub fn new(state: LastOperationState) -> Self {
        Self {
            state: Some(state),
            description: None,
        }
    }
}

// ── Provision / deprovision ─────────────────────────────────────────────────

/// Platform context sent alongside a provision request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContext {
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

/// Body of a provision call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PlatformContext>,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub accepts_incomplete: bool,
    #[serde(default, rename = "organization_guid")]
    pub organization_id: String,
    #[serde(default, rename = "space_guid")]
    pub space_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

impl ProvisionResponse {
    pub fn in_flight(operation: Operation) -> Self {
        Self {
            dashboard_url: None,
            operation: Some(operation),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprovisionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

// ── Bind / unbind ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindResource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_guid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub route: String,
}

/// Body of a bind call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_resource: Option<BindResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindResponse {
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub credentials: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<serde_json::Value>,
}

impl BindResponse {
    /// A response carrying a single `credential` entry
    pub fn with_credential(credential: impl Into<String>) -> Self {
        let mut credentials = serde_json::Map::new();
        credentials.insert(
            "credential".to_string(),
            serde_json::Value::String(credential.into()),
        );
        Self {
            credentials,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbindResponse {}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Error body. `error` is only set for machine-readable error codes such as
/// `AsyncRequired`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub description: String,
}

impl ErrorResponse {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            error: None,
            description: description.into(),
        }
    }

    pub fn async_required() -> Self {
        Self {
            error: Some(ASYNC_REQUIRED_ERROR.to_string()),
            description: ASYNC_REQUIRED_DESCRIPTION.to_string(),
        }
    }
}
