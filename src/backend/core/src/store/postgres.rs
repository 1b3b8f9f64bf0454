//! PostgreSQL store.
//!
//! Uses sqlx with runtime-checked queries. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{sql_window, Store};
use crate::config::DatabaseConfig;
use crate::error::{Result, TollboothError};
use crate::models::{
    NewPermission, NewPlan, NewPrincipal, Permission, PermissionId, Plan, PlanId, Principal,
    PrincipalId, ServiceSet,
};

const PLAN_COLUMNS: &str =
    "id, name, description, allowed_services, usage_limit, created_at, updated_at";
const PERMISSION_COLUMNS: &str = "id, name, description, created_at, updated_at";
const PRINCIPAL_COLUMNS: &str =
    "id, username, credential_secret, is_admin, subscription_plan_id, usage_count, created_at";

/// [`Store`] backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new connection pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to a `Conflict` naming the field.
fn unique_conflict(error: sqlx::Error, entity: &str, field: &str, value: &str) -> TollboothError {
    let duplicate =
        matches!(&error, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
    if duplicate {
        TollboothError::conflict(entity, field, value).with_source(error)
    } else {
        error.into()
    }
}

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Plan Operations
    // ═══════════════════════════════════════════════════════════════════════════

    async fn insert_plan(&self, plan: NewPlan) -> Result<Plan> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            r#"
            INSERT INTO plans (name, description, allowed_services, usage_limit)
            VALUES ($1, $2, $3, $4)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.allowed_services.to_delimited())
        .bind(to_db_count(plan.usage_limit))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn load_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE name = $1 ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_plans(&self, skip: u64, limit: u64) -> Result<Vec<Plan>> {
        let (offset, limit) = sql_window(skip, limit);
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_plan(&self, plan: &Plan) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE plans
            SET name = $2, description = $3, allowed_services = $4, usage_limit = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(plan.id.0)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.allowed_services.to_delimited())
        .bind(to_db_count(plan.usage_limit))
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        // Subscribers are detached by ON DELETE SET NULL.
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "DELETE FROM plans WHERE id = $1 RETURNING {PLAN_COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Permission Operations
    // ═══════════════════════════════════════════════════════════════════════════

    async fn insert_permission(&self, permission: NewPermission) -> Result<Permission> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            INSERT INTO permissions (name, description)
            VALUES ($1, $2)
            RETURNING {PERMISSION_COLUMNS}
            "#
        ))
        .bind(&permission.name)
        .bind(&permission.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "Permission", "name", &permission.name))?;

        Ok(row.into())
    }

    async fn load_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_permissions(&self, skip: u64, limit: u64) -> Result<Vec<Permission>> {
        let (offset, limit) = sql_window(skip, limit);
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_permission(&self, permission: &Permission) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(&permission.description)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "Permission", "name", &permission.name))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "DELETE FROM permissions WHERE id = $1 RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Principal Operations
    // ═══════════════════════════════════════════════════════════════════════════

    async fn insert_principal(&self, principal: NewPrincipal) -> Result<Principal> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            r#"
            INSERT INTO principals (username, credential_secret, is_admin)
            VALUES ($1, $2, $3)
            RETURNING {PRINCIPAL_COLUMNS}
            "#
        ))
        .bind(&principal.username)
        .bind(&principal.password)
        .bind(principal.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "User", "username", &principal.username))?;

        Ok(row.into())
    }

    async fn load_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_principal_by_username(&self, username: &str) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_principals(&self, skip: u64, limit: u64) -> Result<Vec<Principal>> {
        let (offset, limit) = sql_window(skip, limit);
        let rows = sqlx::query_as::<_, PrincipalRow>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_principal(&self, principal: &Principal) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET username = $2, credential_secret = $3, is_admin = $4
            WHERE id = $1
            "#,
        )
        .bind(principal.id.0)
        .bind(&principal.username)
        .bind(&principal.credential_secret)
        .bind(principal.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "User", "username", &principal.username))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            "DELETE FROM principals WHERE id = $1 RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn set_subscription(
        &self,
        id: PrincipalId,
        plan: Option<PlanId>,
    ) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            r#"
            UPDATE principals
            SET subscription_plan_id = $2
            WHERE id = $1
            RETURNING {PRINCIPAL_COLUMNS}
            "#
        ))
        .bind(id.0)
        .bind(plan.map(|p| p.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            let dangling = matches!(
                &error,
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation()
            );
            match plan {
                Some(plan_id) if dangling => {
                    TollboothError::plan_not_found(plan_id).with_source(error)
                }
                _ => error.into(),
            }
        })?;

        Ok(row.map(Into::into))
    }

    async fn increment_usage_if_under_limit(
        &self,
        id: PrincipalId,
        limit: u64,
    ) -> Result<Option<u64>> {
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE principals
            SET usage_count = usage_count + 1
            WHERE id = $1 AND usage_count < $2
            RETURNING usage_count
            "#,
        )
        .bind(id.0)
        .bind(to_db_count(limit))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(count) = updated {
            return Ok(Some(from_db_count(count)));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM principals WHERE id = $1)")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(None)
        } else {
            Err(TollboothError::principal_not_found(id))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: i64,
    name: String,
    description: String,
    allowed_services: String,
    usage_limit: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Self {
            id: PlanId(row.id),
            name: row.name,
            description: row.description,
            allowed_services: ServiceSet::parse(&row.allowed_services),
            usage_limit: from_db_count(row.usage_limit),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: PermissionId(row.id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    id: i64,
    username: String,
    credential_secret: String,
    is_admin: bool,
    subscription_plan_id: Option<i64>,
    usage_count: i64,
    created_at: DateTime<Utc>,
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            id: PrincipalId(row.id),
            username: row.username,
            credential_secret: row.credential_secret,
            is_admin: row.is_admin,
            subscription_plan_id: row.subscription_plan_id.map(PlanId),
            usage_count: from_db_count(row.usage_count),
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_conversions_saturate() {
        assert_eq!(to_db_count(u64::MAX), i64::MAX);
        assert_eq!(from_db_count(-1), 0);
        assert_eq!(from_db_count(42), 42);
    }

    #[test]
    fn test_plan_row_parses_services() {
        let now = Utc::now();
        let plan: Plan = PlanRow {
            id: 3,
            name: "Pro".into(),
            description: String::new(),
            allowed_services: "storage,ai".into(),
            usage_limit: 10,
            created_at: now,
            updated_at: now,
        }
        .into();

        assert_eq!(plan.id, PlanId(3));
        assert!(plan.allows("ai"));
        assert!(!plan.allows("compute"));
        assert_eq!(plan.usage_limit, 10);
    }
}
