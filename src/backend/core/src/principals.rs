//! Admin operations over principals.
//!
//! Usage counters and subscriptions are not touched here; they change only
//! through [`crate::access::AccessEngine`].

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::catalog::require_name;
use crate::error::{Result, TollboothError};
use crate::models::{NewPrincipal, Principal, PrincipalId, PrincipalPatch};
use crate::pagination::ListQuery;
use crate::store::{bounded, Store};

#[derive(Clone)]
pub struct PrincipalDirectory {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl PrincipalDirectory {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[instrument(skip(self, principal), fields(username = %principal.username))]
    pub async fn create(&self, principal: NewPrincipal) -> Result<Principal> {
        require_name("username", &principal.username)?;
        if principal.password.is_empty() {
            return Err(TollboothError::validation("password must not be empty"));
        }
        let principal = bounded(self.timeout, self.store.insert_principal(principal)).await?;
        info!(user_id = %principal.id, is_admin = principal.is_admin, "User created");
        Ok(principal)
    }

    pub async fn get(&self, id: PrincipalId) -> Result<Principal> {
        bounded(self.timeout, self.store.load_principal(id))
            .await?
            .ok_or_else(|| TollboothError::principal_not_found(id))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Principal>> {
        bounded(self.timeout, self.store.find_principal_by_username(username)).await
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<Principal>> {
        bounded(
            self.timeout,
            self.store.list_principals(query.skip, query.effective_limit()),
        )
        .await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: PrincipalId, patch: PrincipalPatch) -> Result<Principal> {
        if matches!(&patch.password, Some(p) if p.is_empty()) {
            return Err(TollboothError::validation("password must not be empty"));
        }

        let mut principal = self.get(id).await?;
        patch.apply(&mut principal);

        if !bounded(self.timeout, self.store.save_principal(&principal)).await? {
            return Err(TollboothError::principal_not_found(id));
        }
        info!("User updated");
        Ok(principal)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: PrincipalId) -> Result<Principal> {
        let principal = bounded(self.timeout, self.store.delete_principal(id))
            .await?
            .ok_or_else(|| TollboothError::principal_not_found(id))?;
        info!("User deleted");
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::MemoryStore;

    fn directory() -> PrincipalDirectory {
        PrincipalDirectory::new(Arc::new(MemoryStore::new()), Duration::from_secs(1))
    }

    fn alice() -> NewPrincipal {
        NewPrincipal {
            username: "alice".into(),
            password: "pw".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_new_principal_starts_unsubscribed_with_zero_usage() {
        let created = directory().create(alice()).await.unwrap();
        assert_eq!(created.usage_count, 0);
        assert_eq!(created.subscription_plan_id, None);
        assert!(!created.is_admin);
    }

    #[tokio::test]
    async fn test_empty_password_is_rejected() {
        let err = directory()
            .create(NewPrincipal {
                password: String::new(),
                ..alice()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_promotes_to_admin() {
        let directory = directory();
        let created = directory.create(alice()).await.unwrap();
        let updated = directory
            .update(
                created.id,
                PrincipalPatch {
                    is_admin: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_admin);
        assert!(directory.get(created.id).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let err = directory().delete(PrincipalId(5)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrincipalNotFound);
    }
}
