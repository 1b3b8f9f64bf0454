use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use super::require_name;
use crate::error::{Result, TollboothError};
use crate::models::{NewPermission, Permission, PermissionId, PermissionPatch};
use crate::pagination::ListQuery;
use crate::store::{bounded, Store};

/// CRUD over named permissions. Names are unique.
#[derive(Clone)]
pub struct PermissionRegistry {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl PermissionRegistry {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[instrument(skip(self, permission), fields(name = %permission.name))]
    pub async fn create(&self, permission: NewPermission) -> Result<Permission> {
        require_name("name", &permission.name)?;
        let permission = bounded(self.timeout, self.store.insert_permission(permission)).await?;
        info!(permission_id = %permission.id, "Permission created");
        Ok(permission)
    }

    pub async fn get(&self, id: PermissionId) -> Result<Permission> {
        bounded(self.timeout, self.store.load_permission(id))
            .await?
            .ok_or_else(|| TollboothError::permission_not_found(id))
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<Permission>> {
        bounded(
            self.timeout,
            self.store.list_permissions(query.skip, query.effective_limit()),
        )
        .await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: PermissionId, patch: PermissionPatch) -> Result<Permission> {
        if let Some(name) = &patch.name {
            require_name("name", name)?;
        }

        let mut permission = self.get(id).await?;
        if patch.is_empty() {
            return Ok(permission);
        }

        patch.apply(&mut permission);
        permission.updated_at = Utc::now();

        if !bounded(self.timeout, self.store.save_permission(&permission)).await? {
            return Err(TollboothError::permission_not_found(id));
        }
        info!("Permission updated");
        Ok(permission)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: PermissionId) -> Result<Permission> {
        let permission = bounded(self.timeout, self.store.delete_permission(id))
            .await?
            .ok_or_else(|| TollboothError::permission_not_found(id))?;
        info!("Permission deleted");
        Ok(permission)
    }
}
