use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::require_name;
use crate::error::{Result, TollboothError};
use crate::models::{NewPlan, Plan, PlanId, PlanPatch};
use crate::pagination::ListQuery;
use crate::store::{bounded, Store};

/// CRUD over subscription plans.
#[derive(Clone)]
pub struct PlanCatalog {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl PlanCatalog {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[instrument(skip(self, plan), fields(name = %plan.name))]
    pub async fn create(&self, plan: NewPlan) -> Result<Plan> {
        require_name("name", &plan.name)?;
        let plan = bounded(self.timeout, self.store.insert_plan(plan)).await?;
        info!(plan_id = %plan.id, "Plan created");
        Ok(plan)
    }

    pub async fn get(&self, id: PlanId) -> Result<Plan> {
        bounded(self.timeout, self.store.load_plan(id))
            .await?
            .ok_or_else(|| TollboothError::plan_not_found(id))
    }

    /// First plan with the given name. Plan names are not unique.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Plan>> {
        bounded(self.timeout, self.store.find_plan_by_name(name)).await
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<Plan>> {
        bounded(
            self.timeout,
            self.store.list_plans(query.skip, query.effective_limit()),
        )
        .await
    }

    /// Apply a partial update. Absent fields keep their stored values.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: PlanId, patch: PlanPatch) -> Result<Plan> {
        if let Some(name) = &patch.name {
            require_name("name", name)?;
        }

        let mut plan = self.get(id).await?;
        if patch.is_empty() {
            debug!("Empty plan patch, nothing to store");
            return Ok(plan);
        }

        patch.apply(&mut plan);
        plan.updated_at = Utc::now();

        if !bounded(self.timeout, self.store.save_plan(&plan)).await? {
            return Err(TollboothError::plan_not_found(id));
        }
        info!("Plan updated");
        Ok(plan)
    }

    /// Delete a plan. Principals subscribed to it are left without a subscription.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: PlanId) -> Result<Plan> {
        let plan = bounded(self.timeout, self.store.delete_plan(id))
            .await?
            .ok_or_else(|| TollboothError::plan_not_found(id))?;
        info!("Plan deleted");
        Ok(plan)
    }
}
