//! Storage layer.
//!
//! Every component takes an `Arc<dyn Store>` at construction. Two backends
//! are provided:
//!
//! - [`MemoryStore`]: process-local maps, used by tests and `storage.backend = "memory"`
//! - [`PgStore`]: PostgreSQL through sqlx, with migrations in `migrations/`
//!
//! Calls made by the service layer are wrapped in [`bounded`] so that a slow
//! backend surfaces as a retryable `StorageTimeout` instead of hanging.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::{
    NewPermission, NewPlan, NewPrincipal, Permission, PermissionId, Plan, PlanId, Principal,
    PrincipalId,
};

/// Persistence operations needed by the catalog, the gate and the engine.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    // ── Plans ────────────────────────────────────────────────────────────────

    async fn insert_plan(&self, plan: NewPlan) -> Result<Plan>;

    async fn load_plan(&self, id: PlanId) -> Result<Option<Plan>>;

    /// First plan (lowest id) with the given name.
    async fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>>;

    async fn list_plans(&self, skip: u64, limit: u64) -> Result<Vec<Plan>>;

    /// Overwrite a stored plan. Returns `false` when the id is unknown.
    async fn save_plan(&self, plan: &Plan) -> Result<bool>;

    /// Delete a plan and detach every principal subscribed to it.
    async fn delete_plan(&self, id: PlanId) -> Result<Option<Plan>>;

    // ── Permissions ──────────────────────────────────────────────────────────

    /// Fails with `Conflict` when the name is taken.
    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission>;

    async fn load_permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>>;

    async fn list_permissions(&self, skip: u64, limit: u64) -> Result<Vec<Permission>>;

    /// Fails with `Conflict` when renaming onto a taken name.
    async fn save_permission(&self, permission: &Permission) -> Result<bool>;

    async fn delete_permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    // ── Principals ───────────────────────────────────────────────────────────

    /// Fails with `Conflict` when the username is taken.
    async fn insert_principal(&self, principal: NewPrincipal) -> Result<Principal>;

    async fn load_principal(&self, id: PrincipalId) -> Result<Option<Principal>>;

    async fn find_principal_by_username(&self, username: &str) -> Result<Option<Principal>>;

    async fn list_principals(&self, skip: u64, limit: u64) -> Result<Vec<Principal>>;

    /// Persist profile fields (`username`, `credential_secret`, `is_admin`).
    /// Usage and subscription are only changed through their own operations.
    async fn save_principal(&self, principal: &Principal) -> Result<bool>;

    async fn delete_principal(&self, id: PrincipalId) -> Result<Option<Principal>>;

    /// Point a principal at a plan (or at nothing). Returns the updated
    /// principal, or `None` when the principal does not exist. Fails with
    /// `PlanNotFound` when the plan vanished concurrently.
    async fn set_subscription(
        &self,
        id: PrincipalId,
        plan: Option<PlanId>,
    ) -> Result<Option<Principal>>;

    /// Atomically increment `usage_count` if it is below `limit`.
    ///
    /// Returns the new count, or `None` when the precondition did not hold.
    /// Fails with `PrincipalNotFound` when the principal does not exist.
    async fn increment_usage_if_under_limit(&self, id: PrincipalId, limit: u64)
        -> Result<Option<u64>>;
}

/// Bound a storage call by `limit`; expiry becomes `StorageTimeout`.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call).await?
}

/// Convert an offset/limit pair to the `i64` values SQL expects.
pub(crate) fn sql_window(skip: u64, limit: u64) -> (i64, i64) {
    (
        i64::try_from(skip).unwrap_or(i64::MAX),
        i64::try_from(limit).unwrap_or(i64::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value = bounded(Duration::from_secs(1), async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let err = bounded(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), ErrorCode::StorageTimeout);
    }

    #[test]
    fn test_sql_window_saturates() {
        assert_eq!(sql_window(0, 100), (0, 100));
        assert_eq!(sql_window(u64::MAX, 1), (i64::MAX, 1));
    }
}
