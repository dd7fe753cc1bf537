//! Service instance record
//!
//! A `ServiceInstance` is created by a provision call, advanced by the
//! reconciliation controller (which appends conditions to its status) and
//! removed by a deprovision call. The store owns the durable copy; every
//! value of this type held elsewhere is a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and concurrency metadata carried by every stored instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Name, unique within the namespace (the broker's instance id)
    pub name: String,

    /// Namespace the broker keeps all of its instances in
    pub namespace: String,

    /// Opaque optimistic-concurrency token assigned by the store.
    /// Zero on objects that have not been persisted yet.
    #[serde(default)]
    pub resource_version: u64,

    /// Set by the store on create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// The requested service instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub metadata: ObjectMeta,

    pub spec: ServiceInstanceSpec,

    #[serde(default)]
    pub status: ServiceInstanceStatus,
}

/// Immutable description of what was provisioned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    /// Catalog service the instance was provisioned from
    #[serde(default)]
    pub service_id: String,

    /// Catalog plan the instance was provisioned from
    #[serde(default)]
    pub plan_id: String,

    /// Provision parameters as sent by the platform
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,

    /// Value handed back to bind requests
    pub credential: String,
}

/// Observed state of the instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstanceStatus {
    /// Condition history, oldest first. Only ever appended to.
    #[serde(default)]
    pub conditions: Vec<ServiceInstanceCondition>,
}

/// A timestamped fact about the provisioning outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceCondition {
    /// Type of the condition, Ready or Failed
    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    /// One of True, False or Unknown
    pub status: ConditionStatus,

    /// Last time the condition transitioned from one status to another
    pub last_transition_time: DateTime<Utc>,

    /// Brief machine readable explanation for the last transition
    #[serde(default)]
    pub reason: String,

    /// Human readable details complementing `reason`
    #[serde(default)]
    pub message: String,
}

/// Condition types an instance can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// Provisioning completed and the instance is usable
    Ready,
    /// Provisioning failed permanently
    Failed,
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ServiceInstance {
    /// Build an unpersisted instance with an empty status
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: ServiceInstanceSpec,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..Default::default()
            },
            spec,
            status: ServiceInstanceStatus::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn resource_version(&self) -> u64 {
        self.metadata.resource_version
    }

    /// Whether a condition of the given type with status True is present
    pub fn has_true_condition(&self, condition_type: ConditionType) -> bool {
        self.status.conditions.iter().any(|c| {
            c.condition_type == condition_type && c.status == ConditionStatus::True
        })
    }

    pub fn is_ready(&self) -> bool {
        self.has_true_condition(ConditionType::Ready)
    }

    pub fn is_failed(&self) -> bool {
        self.has_true_condition(ConditionType::Failed)
    }

    /// True once provisioning reached a terminal outcome, either way
    pub fn is_settled(&self) -> bool {
        self.is_ready() || self.is_failed()
    }

    /// Append a condition to the status history
    pub fn push_condition(&mut self, condition: ServiceInstanceCondition) {
        self.status.conditions.push(condition);
    }
}

impl ServiceInstanceSpec {
    /// Whether a repeated provision request asks for the same thing
    pub fn matches(
        &self,
        service_id: &str,
        plan_id: &str,
        parameters: &BTreeMap<String, String>,
    ) -> bool {
        self.service_id == service_id && self.plan_id == plan_id && &self.parameters == parameters
    }
}

impl ServiceInstanceCondition {
    /// A condition with status True stamped at `now`
    pub fn truthy(
        condition_type: ConditionType,
        now: DateTime<Utc>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type,
            status: ConditionStatus::True,
            last_transition_time: now,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionType::Ready => write!(f, "Ready"),
            ConditionType::Failed => write!(f, "Failed"),
        }
    }
}
