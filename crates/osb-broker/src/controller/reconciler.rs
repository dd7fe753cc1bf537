//! Per-instance transition functions
//!
//! Everything the controller decides is computed here from the delivered
//! snapshot alone, so a restarted controller picks up exactly where the
//! stored conditions say it left off.

use chrono::{DateTime, Utc};
use osb_types::{ConditionType, ServiceInstance, ServiceInstanceCondition};

use super::provisioner::ProvisionError;

/// Reason recorded on a successful provision
pub const REASON_PROVISIONED: &str = "ServiceProvisioned";

/// Message recorded on a successful provision
pub const MESSAGE_PROVISIONED: &str = "This service has been provisioned";

/// Reason recorded when the provisioner gives up
pub const REASON_PROVISION_FAILED: &str = "ProvisionFailed";

/// What to do with an added instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A terminal condition is already recorded
    Skip,
    /// Run the provisioner and record the outcome
    Provision,
}

pub fn plan(instance: &ServiceInstance) -> Action {
    if instance.is_settled() {
        Action::Skip
    } else {
        Action::Provision
    }
}

/// Append the terminal condition for `outcome`
pub fn complete(
    mut instance: ServiceInstance,
    outcome: &Result<(), ProvisionError>,
    now: DateTime<Utc>,
) -> ServiceInstance {
    let condition = match outcome {
        Ok(()) => ready_condition(now),
        Err(e) => failed_condition(now, e),
    };
    instance.push_condition(condition);
    instance
}

pub fn ready_condition(now: DateTime<Utc>) -> ServiceInstanceCondition {
    ServiceInstanceCondition::truthy(
        ConditionType::Ready,
        now,
        REASON_PROVISIONED,
        MESSAGE_PROVISIONED,
    )
}

pub fn failed_condition(now: DateTime<Utc>, error: &ProvisionError) -> ServiceInstanceCondition {
    ServiceInstanceCondition::truthy(
        ConditionType::Failed,
        now,
        REASON_PROVISION_FAILED,
        error.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use osb_types::{ConditionStatus, ServiceInstanceSpec};
    use proptest::prelude::*;

    fn fresh() -> ServiceInstance {
        ServiceInstance::new("brokersdk", "inst", ServiceInstanceSpec::default())
    }

    #[test]
    fn test_fresh_instance_is_provisioned() {
        assert_eq!(plan(&fresh()), Action::Provision);
    }

    #[test]
    fn test_success_appends_ready() {
        let now = Utc::now();
        let done = complete(fresh(), &Ok(()), now);
        assert_eq!(done.status.conditions.len(), 1);

        let cond = &done.status.conditions[0];
        assert_eq!(cond.condition_type, ConditionType::Ready);
        assert_eq!(cond.status, ConditionStatus::True);
        assert_eq!(cond.reason, "ServiceProvisioned");
        assert_eq!(cond.message, "This service has been provisioned");
        assert_eq!(cond.last_transition_time, now);
        assert_eq!(plan(&done), Action::Skip);
    }

    #[test]
    fn test_failure_appends_failed() {
        let done = complete(
            fresh(),
            &Err(ProvisionError("quota exceeded".into())),
            Utc::now(),
        );
        assert!(done.is_failed());
        assert!(!done.is_ready());
        assert_eq!(done.status.conditions[0].reason, "ProvisionFailed");
        assert_eq!(done.status.conditions[0].message, "quota exceeded");
        assert_eq!(plan(&done), Action::Skip);
    }

    #[test]
    fn test_non_true_conditions_do_not_settle() {
        let mut pending = ready_condition(Utc::now());
        pending.status = ConditionStatus::False;
        let mut si = fresh();
        si.push_condition(pending);
        assert_eq!(plan(&si), Action::Provision);
    }

    proptest! {
        /// Driving an instance through any number of plan/complete rounds
        /// records exactly one terminal condition.
        #[test]
        fn property_completion_happens_once(
            rounds in 1usize..16,
            failures in proptest::collection::vec(any::<bool>(), 16),
        ) {
            let mut si = fresh();
            for fail in failures.iter().take(rounds) {
                if plan(&si) == Action::Provision {
                    let outcome = if *fail {
                        Err(ProvisionError("boom".into()))
                    } else {
                        Ok(())
                    };
                    si = complete(si, &outcome, Utc::now());
                }
            }

            let terminal = si
                .status
                .conditions
                .iter()
                .filter(|c| c.status == ConditionStatus::True)
                .count();
            prop_assert_eq!(terminal, 1);
            prop_assert!(si.is_ready() != si.is_failed());
        }
    }
}
