#![allow(clippy::result_large_err)]
//! # Tollbooth Core
//!
//! A subscription and permission gateway.
//!
//! ## Architecture
//!
//! - **Plan Catalog**: Subscription plans with an allowed-service set and a usage quota
//! - **Permission Registry**: Named permissions with unique names
//! - **Principal Directory**: Users, the admin flag and subscription links
//! - **Access Engine**: Subscription, quota and membership checks with atomic usage accounting
//! - **Authentication**: Bearer tokens issued against stored credentials
//! - **Store**: PostgreSQL or in-memory persistence behind one trait
//! - **Observability**: Structured logging, OTLP tracing and Prometheus metrics

pub mod access;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod principals;
pub mod store;

pub use error::{ErrorCode, ErrorDetails, ErrorSeverity, Result, TollboothError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::access::{AccessDecision, AccessEngine, AccessReport, DenialReason, UsageReport};
    pub use crate::auth::{AdminPrincipal, Authenticator, CurrentPrincipal};
    pub use crate::catalog::{PermissionRegistry, PlanCatalog};
    pub use crate::error::{ErrorCode, Result, TollboothError};
    pub use crate::models::{
        NewPermission, NewPlan, NewPrincipal, Permission, PermissionId, Plan, PlanId, PlanPatch,
        Principal, PrincipalId, ServiceSet,
    };
    pub use crate::principals::PrincipalDirectory;
    pub use crate::store::{MemoryStore, PgStore, Store};
}
