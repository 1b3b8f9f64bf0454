//! Access decisions and usage accounting.
//!
//! For a principal and a requested service name the engine checks, in this
//! order:
//!
//! 1. the principal has a subscription whose plan still exists
//! 2. the usage counter is below the plan's quota
//! 3. the service is in the plan's allowed set
//!
//! A grant increments the usage counter atomically at the storage layer, so
//! concurrent calls for one principal never push it past the quota.

mod engine;

pub use engine::AccessEngine;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::models::{PlanId, PrincipalId};

/// Why an access check was refused. Variants are listed in check order.
///
/// On the wire a reason is always its [`as_str`](DenialReason::as_str) form,
/// whether it appears in an access report or in an error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    NoActiveSubscription,
    UsageLimitReached,
    ServiceNotInPlan,
}

impl DenialReason {
    pub const ALL: [DenialReason; 3] = [
        DenialReason::NoActiveSubscription,
        DenialReason::UsageLimitReached,
        DenialReason::ServiceNotInPlan,
    ];

    /// Stable, machine-readable reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoActiveSubscription => "no active subscription",
            DenialReason::UsageLimitReached => "usage limit reached",
            DenialReason::ServiceNotInPlan => "service not included in plan",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn from_reason_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.as_str() == value)
    }

    /// Short label for metrics.
    fn label(&self) -> &'static str {
        match self {
            DenialReason::NoActiveSubscription => "no_subscription",
            DenialReason::UsageLimitReached => "quota_exhausted",
            DenialReason::ServiceNotInPlan => "service_not_in_plan",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DenialReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DenialReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_reason_str(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown denial reason: {raw}")))
    }
}

/// Outcome of [`AccessEngine::check_and_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { current_usage: u64, limit: u64 },
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            AccessDecision::Granted { .. } => None,
            AccessDecision::Denied(reason) => Some(*reason),
        }
    }
}

/// Read-only view of whether a principal could use a service right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReport {
    pub service: String,
    pub has_access: bool,
    pub current_usage: u64,
    /// Zero when the principal has no subscription.
    pub limit: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

/// Usage after a recorded access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub service: String,
    pub current_usage: u64,
    pub limit: u64,
}

/// A principal's link to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: PrincipalId,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub usage_count: u64,
    pub usage_limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(DenialReason::NoActiveSubscription.as_str(), "no active subscription");
        assert_eq!(DenialReason::UsageLimitReached.to_string(), "usage limit reached");
        assert_eq!(DenialReason::ServiceNotInPlan.as_str(), "service not included in plan");
    }

    #[test]
    fn test_reason_serializes_as_reason_string() {
        for reason in DenialReason::ALL {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, reason.as_str());
            assert_eq!(serde_json::from_value::<DenialReason>(json).unwrap(), reason);
        }
        assert!(serde_json::from_str::<DenialReason>("\"usage_limit_reached\"").is_err());
    }

    #[test]
    fn test_decision_accessors() {
        let granted = AccessDecision::Granted { current_usage: 1, limit: 2 };
        assert!(granted.is_granted());
        assert_eq!(granted.denial_reason(), None);

        let denied = AccessDecision::Denied(DenialReason::UsageLimitReached);
        assert!(!denied.is_granted());
        assert_eq!(denied.denial_reason(), Some(DenialReason::UsageLimitReached));
    }

    #[test]
    fn test_report_omits_reason_when_granted() {
        let report = AccessReport {
            service: "storage".into(),
            has_access: true,
            current_usage: 0,
            limit: 10,
            reason: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("reason").is_none());
    }
}
