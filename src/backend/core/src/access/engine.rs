use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{AccessDecision, AccessReport, DenialReason, Subscription, UsageReport};
use crate::error::{Result, TollboothError};
use crate::models::{Plan, PlanId, Principal, PrincipalId};
use crate::store::{bounded, Store};

/// Decides service access and keeps usage counters consistent.
#[derive(Clone)]
pub struct AccessEngine {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl AccessEngine {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Check access and, when granted, consume one unit of quota.
    #[instrument(skip_all, fields(user_id = %principal_id, service = %service))]
    pub async fn check_and_consume(
        &self,
        principal_id: PrincipalId,
        service: &str,
    ) -> Result<AccessDecision> {
        let principal = self.principal(principal_id).await?;
        let plan = match self.subscribed_plan(&principal).await? {
            Some(plan) => plan,
            None => return Ok(self.deny(service, DenialReason::NoActiveSubscription)),
        };

        if let Some(reason) = evaluate(&principal, &plan, service) {
            return Ok(self.deny(service, reason));
        }

        let incremented = bounded(
            self.timeout,
            self.store
                .increment_usage_if_under_limit(principal_id, plan.usage_limit),
        )
        .await?;

        match incremented {
            Some(current_usage) => {
                record_decision(service, None);
                debug!(current_usage, limit = plan.usage_limit, "Access granted");
                Ok(AccessDecision::Granted {
                    current_usage,
                    limit: plan.usage_limit,
                })
            }
            // Another request consumed the last unit between the read and the increment.
            None => Ok(self.deny(service, DenialReason::UsageLimitReached)),
        }
    }

    /// Same checks as [`check_and_consume`](Self::check_and_consume), without consuming.
    #[instrument(skip_all, fields(user_id = %principal_id, service = %service))]
    pub async fn query_access(&self, principal_id: PrincipalId, service: &str) -> Result<AccessReport> {
        let principal = self.principal(principal_id).await?;
        let plan = self.subscribed_plan(&principal).await?;

        let (limit, reason) = match &plan {
            Some(plan) => (plan.usage_limit, evaluate(&principal, plan, service)),
            None => (0, Some(DenialReason::NoActiveSubscription)),
        };

        Ok(AccessReport {
            service: service.to_string(),
            has_access: reason.is_none(),
            current_usage: principal.usage_count,
            limit,
            reason,
        })
    }

    /// Record one use of `service`. A refused check surfaces as `AccessDenied`.
    pub async fn record_usage(&self, principal_id: PrincipalId, service: &str) -> Result<UsageReport> {
        match self.check_and_consume(principal_id, service).await? {
            AccessDecision::Granted {
                current_usage,
                limit,
            } => Ok(UsageReport {
                service: service.to_string(),
                current_usage,
                limit,
            }),
            AccessDecision::Denied(reason) => Err(TollboothError::access_denied(reason)),
        }
    }

    /// Point a principal at a plan. Accumulated usage is kept.
    #[instrument(skip_all, fields(user_id = %principal_id, plan_id = %plan_id))]
    pub async fn subscribe(&self, principal_id: PrincipalId, plan_id: PlanId) -> Result<Subscription> {
        let plan = bounded(self.timeout, self.store.load_plan(plan_id))
            .await?
            .ok_or_else(|| TollboothError::plan_not_found(plan_id))?;

        let principal = bounded(
            self.timeout,
            self.store.set_subscription(principal_id, Some(plan_id)),
        )
        .await?
        .ok_or_else(|| TollboothError::principal_not_found(principal_id))?;

        info!(plan_name = %plan.name, "Subscribed");
        Ok(Subscription {
            user_id: principal.id,
            plan_id: plan.id,
            plan_name: plan.name,
            usage_count: principal.usage_count,
            usage_limit: plan.usage_limit,
        })
    }

    /// Drop a principal's subscription.
    #[instrument(skip_all, fields(user_id = %principal_id))]
    pub async fn unsubscribe(&self, principal_id: PrincipalId) -> Result<Principal> {
        let principal = bounded(self.timeout, self.store.set_subscription(principal_id, None))
            .await?
            .ok_or_else(|| TollboothError::principal_not_found(principal_id))?;
        info!("Unsubscribed");
        Ok(principal)
    }

    async fn principal(&self, id: PrincipalId) -> Result<Principal> {
        bounded(self.timeout, self.store.load_principal(id))
            .await?
            .ok_or_else(|| TollboothError::principal_not_found(id))
    }

    /// Resolve the subscription link. A dangling link counts as no subscription.
    async fn subscribed_plan(&self, principal: &Principal) -> Result<Option<Plan>> {
        match principal.subscription_plan_id {
            Some(plan_id) => bounded(self.timeout, self.store.load_plan(plan_id)).await,
            None => Ok(None),
        }
    }

    fn deny(&self, service: &str, reason: DenialReason) -> AccessDecision {
        record_decision(service, Some(reason));
        debug!(reason = %reason, "Access denied");
        AccessDecision::Denied(reason)
    }
}

/// Quota first, then membership.
fn evaluate(principal: &Principal, plan: &Plan, service: &str) -> Option<DenialReason> {
    if principal.usage_count >= plan.usage_limit {
        Some(DenialReason::UsageLimitReached)
    } else if !plan.allows(service) {
        Some(DenialReason::ServiceNotInPlan)
    } else {
        None
    }
}

fn record_decision(service: &str, reason: Option<DenialReason>) {
    let (outcome, reason) = match reason {
        None => ("granted", "none"),
        Some(reason) => ("denied", reason.label()),
    };
    counter!(
        "tollbooth_access_decisions_total",
        "outcome" => outcome,
        "reason" => reason,
        "service" => service.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::ServiceSet;

    fn plan(services: &str, limit: u64) -> Plan {
        let now = Utc::now();
        Plan {
            id: PlanId(1),
            name: "Basic".into(),
            description: String::new(),
            allowed_services: ServiceSet::parse(services),
            usage_limit: limit,
            created_at: now,
            updated_at: now,
        }
    }

    fn principal(usage: u64) -> Principal {
        Principal {
            id: PrincipalId(2),
            username: "u".into(),
            credential_secret: "pw".into(),
            is_admin: false,
            subscription_plan_id: Some(PlanId(1)),
            usage_count: usage,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_evaluate_checks_quota_before_membership() {
        let plan = plan("storage", 1);
        assert_eq!(evaluate(&principal(0), &plan, "storage"), None);
        assert_eq!(
            evaluate(&principal(0), &plan, "compute"),
            Some(DenialReason::ServiceNotInPlan)
        );
        assert_eq!(
            evaluate(&principal(1), &plan, "compute"),
            Some(DenialReason::UsageLimitReached)
        );
    }

    #[test]
    fn test_zero_quota_never_grants() {
        assert_eq!(
            evaluate(&principal(0), &plan("storage", 0), "storage"),
            Some(DenialReason::UsageLimitReached)
        );
    }
}
