//! Route table.

use axum::{
    routing::{get, post},
    Router,
};

use super::{handlers, AppState};

/// Build the router without state or middleware.
///
/// # Endpoints
///
/// ## Public
/// - `POST /token` - Exchange username and password for a bearer token
/// - `GET /health` - Liveness plus store reachability
/// - `GET /metrics` - Prometheus metrics
///
/// ## Authenticated
/// - `GET /me` - Current user
/// - `POST /me/subscription` - Subscribe to a plan
/// - `DELETE /me/subscription` - Drop the subscription
/// - `POST /services/:service` - Use a service (consumes quota)
/// - `GET /services/:service/access` - Check access without consuming
///
/// ## Admin
/// - `GET|POST /plans`, `GET|PUT|PATCH|DELETE /plans/:id`
/// - `GET|POST /permissions`, `GET|PUT|PATCH|DELETE /permissions/:id`
/// - `GET|POST /users`, `GET|PATCH|DELETE /users/:id`
/// - `GET /users/:id/access/:service` - Check another user's access
/// - `POST /users/:id/usage/:service` - Record usage for another user
pub fn router() -> Router<AppState> {
    Router::new()
        // Public endpoints
        .route(paths::TOKEN, post(handlers::auth::login))
        .route(paths::HEALTH, get(handlers::health_check))
        .route(paths::METRICS, get(handlers::prometheus_metrics))
        // Self-service endpoints
        .route(paths::ME, get(handlers::auth::me))
        .route(
            paths::MY_SUBSCRIPTION,
            post(handlers::access::subscribe).delete(handlers::access::unsubscribe),
        )
        .route(paths::SERVICE, post(handlers::access::use_service))
        .route(paths::SERVICE_ACCESS, get(handlers::access::my_access))
        // Plan endpoints
        .route(
            paths::PLANS,
            get(handlers::plans::list_plans).post(handlers::plans::create_plan),
        )
        .route(
            paths::PLAN,
            get(handlers::plans::get_plan)
                .put(handlers::plans::update_plan)
                .patch(handlers::plans::update_plan)
                .delete(handlers::plans::delete_plan),
        )
        // Permission endpoints
        .route(
            paths::PERMISSIONS,
            get(handlers::permissions::list_permissions)
                .post(handlers::permissions::create_permission),
        )
        .route(
            paths::PERMISSION,
            get(handlers::permissions::get_permission)
                .put(handlers::permissions::update_permission)
                .patch(handlers::permissions::update_permission)
                .delete(handlers::permissions::delete_permission),
        )
        // User endpoints
        .route(
            paths::USERS,
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            paths::USER,
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(paths::USER_ACCESS, get(handlers::access::user_access))
        .route(paths::USER_USAGE, post(handlers::access::record_usage))
}

/// Route constants for use in clients and documentation.
pub mod paths {
    pub const TOKEN: &str = "/token";
    pub const HEALTH: &str = "/health";
    pub const METRICS: &str = "/metrics";

    pub const ME: &str = "/me";
    pub const MY_SUBSCRIPTION: &str = "/me/subscription";
    pub const SERVICE: &str = "/services/:service";
    pub const SERVICE_ACCESS: &str = "/services/:service/access";

    pub const PLANS: &str = "/plans";
    pub const PLAN: &str = "/plans/:id";

    pub const PERMISSIONS: &str = "/permissions";
    pub const PERMISSION: &str = "/permissions/:id";

    pub const USERS: &str = "/users";
    pub const USER: &str = "/users/:id";
    pub const USER_ACCESS: &str = "/users/:id/access/:service";
    pub const USER_USAGE: &str = "/users/:id/usage/:service";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted() {
        for path in [
            paths::TOKEN,
            paths::ME,
            paths::SERVICE,
            paths::PLANS,
            paths::PERMISSION,
            paths::USER_USAGE,
        ] {
            assert!(path.starts_with('/'));
            assert!(!path.ends_with('/'));
        }
    }
}
