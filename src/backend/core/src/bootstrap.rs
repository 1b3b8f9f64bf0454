//! First-run seeding of an admin principal and a default plan.

use tracing::{info, warn};

use crate::catalog::PlanCatalog;
use crate::config::BootstrapConfig;
use crate::error::Result;
use crate::models::{NewPlan, NewPrincipal, ServiceSet};
use crate::principals::PrincipalDirectory;

/// What [`seed`] created. Existing records are left alone.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedOutcome {
    pub admin_created: bool,
    pub plan_created: bool,
}

/// Create the configured admin and default plan when they are missing.
pub async fn seed(
    config: &BootstrapConfig,
    principals: &PrincipalDirectory,
    plans: &PlanCatalog,
) -> Result<SeedOutcome> {
    let mut outcome = SeedOutcome::default();
    if !config.enabled {
        info!("Bootstrap disabled");
        return Ok(outcome);
    }

    match &config.admin_password {
        Some(password) => {
            if principals.find_by_username(&config.admin_username).await?.is_none() {
                principals
                    .create(NewPrincipal {
                        username: config.admin_username.clone(),
                        password: password.clone(),
                        is_admin: true,
                    })
                    .await?;
                outcome.admin_created = true;
                info!(username = %config.admin_username, "Seeded admin user");
            }
        }
        None => warn!("bootstrap.admin_password is not set, skipping admin seed"),
    }

    if plans.find_by_name(&config.default_plan_name).await?.is_none() {
        plans
            .create(NewPlan {
                name: config.default_plan_name.clone(),
                description: config.default_plan_description.clone(),
                allowed_services: ServiceSet::parse(&config.default_plan_services),
                usage_limit: config.default_plan_limit,
            })
            .await?;
        outcome.plan_created = true;
        info!(name = %config.default_plan_name, "Seeded default plan");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use std::sync::Arc;
    use std::time::Duration;

    fn components() -> (PrincipalDirectory, PlanCatalog) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let timeout = Duration::from_secs(1);
        (
            PrincipalDirectory::new(store.clone(), timeout),
            PlanCatalog::new(store, timeout),
        )
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (principals, plans) = components();
        let config = BootstrapConfig {
            admin_password: Some("secret".into()),
            ..Default::default()
        };

        let first = seed(&config, &principals, &plans).await.unwrap();
        assert!(first.admin_created && first.plan_created);

        let second = seed(&config, &principals, &plans).await.unwrap();
        assert_eq!(second, SeedOutcome::default());

        let admin = principals.find_by_username("admin").await.unwrap().unwrap();
        assert!(admin.is_admin);
        let plan = plans.find_by_name("Basic").await.unwrap().unwrap();
        assert_eq!(plan.allowed_services.to_delimited(), "storage,compute");
        assert_eq!(plan.usage_limit, 100);
    }

    #[tokio::test]
    async fn test_missing_password_skips_admin_only() {
        let (principals, plans) = components();
        let outcome = seed(&BootstrapConfig::default(), &principals, &plans).await.unwrap();
        assert!(!outcome.admin_created);
        assert!(outcome.plan_created);
    }

    #[tokio::test]
    async fn test_disabled_seeds_nothing() {
        let (principals, plans) = components();
        let config = BootstrapConfig {
            enabled: false,
            admin_password: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(
            seed(&config, &principals, &plans).await.unwrap(),
            SeedOutcome::default()
        );
    }
}
