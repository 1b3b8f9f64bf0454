//! HTTP API.
//!
//! Every successful response is wrapped in [`ApiResponse`]; failures use the
//! error body produced by [`crate::error::TollboothError`].
//!
//! Authentication is a bearer token obtained from `POST /token`. Admin
//! routes take an [`AdminPrincipal`](crate::auth::AdminPrincipal) extractor,
//! user routes a [`CurrentPrincipal`](crate::auth::CurrentPrincipal).

pub mod extract;
mod handlers;
pub mod routes;

use axum::{extract::FromRef, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::access::AccessEngine;
use crate::auth::Authenticator;
use crate::catalog::{PermissionRegistry, PlanCatalog};
use crate::config::Config;
use crate::error::Result;
use crate::models::ServiceVocabulary;
use crate::principals::PrincipalDirectory;
use crate::store::Store;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Arc<Authenticator>,
    pub plans: PlanCatalog,
    pub permissions: PermissionRegistry,
    pub principals: PrincipalDirectory,
    pub access: AccessEngine,
    pub services: Arc<ServiceVocabulary>,
    pub metrics: PrometheusHandle,
    pub storage_timeout: Duration,
}

impl AppState {
    /// Wire every component to one store.
    pub fn new(store: Arc<dyn Store>, config: &Config, metrics: PrometheusHandle) -> Result<Self> {
        let timeout = config.storage.timeout;
        let auth = Authenticator::new(&config.auth, store.clone(), timeout)?;

        Ok(Self {
            auth: Arc::new(auth),
            plans: PlanCatalog::new(store.clone(), timeout),
            permissions: PermissionRegistry::new(store.clone(), timeout),
            principals: PrincipalDirectory::new(store.clone(), timeout),
            access: AccessEngine::new(store.clone(), timeout),
            services: Arc::new(config.access.vocabulary()),
            metrics,
            storage_timeout: timeout,
            store,
        })
    }
}

impl FromRef<AppState> for Arc<Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// API response wrapper.
#[derive(Debug, serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "test data");
    }
}
