//! In-memory store.
//!
//! Plans and permissions live in ordered maps behind `RwLock`s; principals
//! live in a `DashMap` so that the usage increment only locks one shard.
//! Lock order is always plans before principals.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use super::Store;
use crate::error::{Result, TollboothError};
use crate::models::{
    NewPermission, NewPlan, NewPrincipal, Permission, PermissionId, Plan, PlanId, Principal,
    PrincipalId,
};

/// Process-local [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    plans: RwLock<BTreeMap<PlanId, Plan>>,
    permissions: RwLock<BTreeMap<PermissionId, Permission>>,
    principals: DashMap<PrincipalId, Principal>,
    /// Serializes principal inserts and renames so username checks hold.
    principal_writes: Mutex<()>,
    next_id: AtomicI64,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, to exercise storage timeouts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn page<T>(items: impl Iterator<Item = T>, skip: u64, limit: u64) -> Vec<T> {
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        items.skip(skip).take(limit).collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.pause().await;
        Ok(())
    }

    // ── Plans ────────────────────────────────────────────────────────────────

    async fn insert_plan(&self, plan: NewPlan) -> Result<Plan> {
        self.pause().await;
        let now = Utc::now();
        let plan = Plan {
            id: PlanId(self.allocate_id()),
            name: plan.name,
            description: plan.description,
            allowed_services: plan.allowed_services,
            usage_limit: plan.usage_limit,
            created_at: now,
            updated_at: now,
        };
        self.plans.write().insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn load_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        self.pause().await;
        Ok(self.plans.read().get(&id).cloned())
    }

    async fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>> {
        self.pause().await;
        Ok(self.plans.read().values().find(|p| p.name == name).cloned())
    }

    async fn list_plans(&self, skip: u64, limit: u64) -> Result<Vec<Plan>> {
        self.pause().await;
        let plans = self.plans.read();
        Ok(Self::page(plans.values().cloned(), skip, limit))
    }

    async fn save_plan(&self, plan: &Plan) -> Result<bool> {
        self.pause().await;
        let mut plans = self.plans.write();
        match plans.get_mut(&plan.id) {
            Some(stored) => {
                *stored = plan.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        self.pause().await;
        let mut plans = self.plans.write();
        let removed = plans.remove(&id);
        if removed.is_some() {
            for mut principal in self.principals.iter_mut() {
                if principal.subscription_plan_id == Some(id) {
                    principal.subscription_plan_id = None;
                }
            }
        }
        Ok(removed)
    }

    // ── Permissions ──────────────────────────────────────────────────────────

    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission> {
        self.pause().await;
        let mut permissions = self.permissions.write();
        if permissions.values().any(|p| p.name == permission.name) {
            return Err(TollboothError::conflict("Permission", "name", permission.name));
        }
        let now = Utc::now();
        let permission = Permission {
            id: PermissionId(self.allocate_id()),
            name: permission.name,
            description: permission.description,
            created_at: now,
            updated_at: now,
        };
        permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn load_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.pause().await;
        Ok(self.permissions.read().get(&id).cloned())
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>> {
        self.pause().await;
        Ok(self.permissions.read().values().find(|p| p.name == name).cloned())
    }

    async fn list_permissions(&self, skip: u64, limit: u64) -> Result<Vec<Permission>> {
        self.pause().await;
        let permissions = self.permissions.read();
        Ok(Self::page(permissions.values().cloned(), skip, limit))
    }

    async fn save_permission(&self, permission: &Permission) -> Result<bool> {
        self.pause().await;
        let mut permissions = self.permissions.write();
        if permissions
            .values()
            .any(|p| p.id != permission.id && p.name == permission.name)
        {
            return Err(TollboothError::conflict("Permission", "name", permission.name.clone()));
        }
        match permissions.get_mut(&permission.id) {
            Some(stored) => {
                *stored = permission.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.pause().await;
        Ok(self.permissions.write().remove(&id))
    }

    // ── Principals ───────────────────────────────────────────────────────────

    async fn insert_principal(&self, principal: NewPrincipal) -> Result<Principal> {
        self.pause().await;
        let _guard = self.principal_writes.lock();
        if self.principals.iter().any(|p| p.username == principal.username) {
            return Err(TollboothError::conflict("User", "username", principal.username));
        }
        let principal = Principal {
            id: PrincipalId(self.allocate_id()),
            username: principal.username,
            credential_secret: principal.password,
            is_admin: principal.is_admin,
            subscription_plan_id: None,
            usage_count: 0,
            created_at: Utc::now(),
        };
        self.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn load_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        self.pause().await;
        Ok(self.principals.get(&id).map(|p| p.clone()))
    }

    async fn find_principal_by_username(&self, username: &str) -> Result<Option<Principal>> {
        self.pause().await;
        Ok(self
            .principals
            .iter()
            .find(|p| p.username == username)
            .map(|p| p.clone()))
    }

    async fn list_principals(&self, skip: u64, limit: u64) -> Result<Vec<Principal>> {
        self.pause().await;
        let mut all: Vec<Principal> = self.principals.iter().map(|p| p.clone()).collect();
        all.sort_by_key(|p| p.id);
        Ok(Self::page(all.into_iter(), skip, limit))
    }

    async fn save_principal(&self, principal: &Principal) -> Result<bool> {
        self.pause().await;
        let _guard = self.principal_writes.lock();
        if self
            .principals
            .iter()
            .any(|p| p.id != principal.id && p.username == principal.username)
        {
            return Err(TollboothError::conflict("User", "username", principal.username.clone()));
        }
        match self.principals.get_mut(&principal.id) {
            Some(mut stored) => {
                stored.username = principal.username.clone();
                stored.credential_secret = principal.credential_secret.clone();
                stored.is_admin = principal.is_admin;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        self.pause().await;
        Ok(self.principals.remove(&id).map(|(_, p)| p))
    }

    async fn set_subscription(
        &self,
        id: PrincipalId,
        plan: Option<PlanId>,
    ) -> Result<Option<Principal>> {
        self.pause().await;
        let plans = self.plans.read();
        if let Some(plan_id) = plan {
            if !plans.contains_key(&plan_id) {
                return Err(TollboothError::plan_not_found(plan_id));
            }
        }
        Ok(self.principals.get_mut(&id).map(|mut principal| {
            principal.subscription_plan_id = plan;
            principal.clone()
        }))
    }

    async fn increment_usage_if_under_limit(
        &self,
        id: PrincipalId,
        limit: u64,
    ) -> Result<Option<u64>> {
        self.pause().await;
        let mut principal = self
            .principals
            .get_mut(&id)
            .ok_or_else(|| TollboothError::principal_not_found(id))?;
        if principal.usage_count < limit {
            principal.usage_count += 1;
            Ok(Some(principal.usage_count))
        } else {
            Ok(None)
        }
    }
}
