use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{id_type, ServiceSet};

id_type!(
    /// Identifier of a subscription plan.
    PlanId
);

/// A named bundle of allowed services plus a usage quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub description: String,
    pub allowed_services: ServiceSet,
    pub usage_limit: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn allows(&self, service: &str) -> bool {
        self.allowed_services.contains(service)
    }
}

/// Fields for a plan that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub description: String,
    pub allowed_services: ServiceSet,
    pub usage_limit: u64,
}

/// Partial update for a plan. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub allowed_services: Option<ServiceSet>,
    pub usage_limit: Option<u64>,
}

impl PlanPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.allowed_services.is_none()
            && self.usage_limit.is_none()
    }

    /// Apply the present fields to `plan`.
    pub fn apply(self, plan: &mut Plan) {
        if let Some(name) = self.name {
            plan.name = name;
        }
        if let Some(description) = self.description {
            plan.description = description;
        }
        if let Some(services) = self.allowed_services {
            plan.allowed_services = services;
        }
        if let Some(limit) = self.usage_limit {
            plan.usage_limit = limit;
        }
    }
}
