//! Error handling for Tollbooth Core.
//!
//! This module provides:
//! - A single error type with machine-readable codes and chaining
//! - HTTP status code mapping for API responses
//! - User-facing messages kept apart from internal diagnostics
//! - Severity-based logging with tracing
//! - An error counter for metrics
//!
//! # Usage
//!
//! ```rust
//! use tollbooth_core::error::{ErrorCode, Result, TollboothError};
//! use tollbooth_core::models::PlanId;
//!
//! fn load(id: PlanId) -> Result<()> {
//!     Err(TollboothError::plan_not_found(id))
//! }
//!
//! let err = load(PlanId(7)).unwrap_err();
//! assert_eq!(err.code(), ErrorCode::PlanNotFound);
//! assert_eq!(err.http_status().as_u16(), 404);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::access::DenialReason;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Tollbooth operations.
pub type Result<T> = std::result::Result<T, TollboothError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication/Authorization (1000-1099)
    Unauthenticated,
    Forbidden,
    AccessDenied,

    // Lookup Errors (1100-1199)
    PlanNotFound,
    PermissionNotFound,
    PrincipalNotFound,
    ServiceNotFound,
    Conflict,

    // Validation Errors (1200-1299)
    ValidationError,

    // Storage Errors (2000-2099)
    StorageError,
    StorageUnavailable,
    StorageTimeout,

    // Configuration Errors (5000-5099)
    ConfigurationError,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::Unauthenticated => 1000,
            Self::Forbidden => 1001,
            Self::AccessDenied => 1002,

            Self::PlanNotFound => 1100,
            Self::PermissionNotFound => 1101,
            Self::PrincipalNotFound => 1102,
            Self::ServiceNotFound => 1103,
            Self::Conflict => 1104,

            Self::ValidationError => 1200,

            Self::StorageError => 2000,
            Self::StorageUnavailable => 2001,
            Self::StorageTimeout => 2002,

            Self::ConfigurationError => 5000,

            Self::InternalError => 9000,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,

            Self::Forbidden | Self::AccessDenied => StatusCode::FORBIDDEN,

            Self::PlanNotFound
            | Self::PermissionNotFound
            | Self::PrincipalNotFound
            | Self::ServiceNotFound => StatusCode::NOT_FOUND,

            Self::Conflict => StatusCode::CONFLICT,

            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,

            Self::StorageUnavailable | Self::StorageTimeout => StatusCode::SERVICE_UNAVAILABLE,

            Self::StorageError | Self::ConfigurationError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Check if this error is retryable.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable | Self::StorageTimeout)
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "authorization",
            1100..=1199 => "lookup",
            1200..=1299 => "validation",
            2000..=2099 => "storage",
            5000..=5099 => "configuration",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller errors (bad input, denials, missing records)
    Low,
    /// Operational issues (timeouts, auth failures)
    Medium,
    /// System errors (store failures, bad configuration)
    High,
    /// Errors requiring immediate attention
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::AccessDenied
            | ErrorCode::PlanNotFound
            | ErrorCode::PermissionNotFound
            | ErrorCode::PrincipalNotFound
            | ErrorCode::ServiceNotFound
            | ErrorCode::Conflict
            | ErrorCode::ValidationError => Self::Low,

            ErrorCode::Unauthenticated
            | ErrorCode::Forbidden
            | ErrorCode::StorageTimeout => Self::Medium,

            ErrorCode::StorageError | ErrorCode::ConfigurationError => Self::High,

            ErrorCode::StorageUnavailable | ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (plan, permission, principal)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Machine-readable denial reason for access decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Retry information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_secs = Some(seconds);
        self
    }

    fn is_empty(&self) -> bool {
        self.context.is_empty()
            && self.entity_id.is_none()
            && self.reason.is_none()
            && self.retry_after_secs.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Tollbooth Core.
#[derive(Error, Debug)]
pub struct TollboothError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to expose to clients)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for TollboothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl TollboothError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an unauthenticated error.
    pub fn unauthenticated(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a conflict error for a duplicate unique field.
    pub fn conflict(entity_type: &str, field: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(
            ErrorCode::Conflict,
            format!("{} with {} '{}' already exists", entity_type, field, value),
        )
        .with_details(ErrorDetails::new().with_context(field, &value))
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message.into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the user-friendly message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the error details.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// Get the denial reason carried by an `AccessDenied` error.
    pub fn denial_reason(&self) -> Option<&str> {
        self.details.reason.as_deref()
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    /// Record error metrics.
    fn record_metrics(&self) {
        counter!(
            "tollbooth_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "retryable" => self.is_retryable().to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false for errors
    pub success: bool,

    /// Error information
    pub error: ErrorInfo,
}

/// Detailed error information for API responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code
    pub numeric_code: u32,

    /// User-friendly error message
    pub message: String,

    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,

    /// Timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&TollboothError> for ErrorResponse {
    fn from(error: &TollboothError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details: if error.details.is_empty() {
                    None
                } else {
                    Some(error.details.clone())
                },
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for TollboothError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for TollboothError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                    return Self::with_internal(
                        ErrorCode::Conflict,
                        "A record with this identifier already exists",
                        format!("Constraint violation: {}", constraint),
                    )
                    .with_source(error);
                }
                (ErrorCode::StorageError, "A storage error occurred")
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => (
                ErrorCode::StorageUnavailable,
                "Unable to reach the storage backend",
            ),
            _ => (ErrorCode::StorageError, "A storage error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<sqlx::migrate::MigrateError> for TollboothError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::with_internal(
            ErrorCode::StorageError,
            "Database migration failed",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<jsonwebtoken::errors::Error> for TollboothError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        let user_msg = match error.kind() {
            ErrorKind::ExpiredSignature => "The authentication token has expired",
            _ => "The provided token is invalid",
        };

        Self::with_internal(ErrorCode::Unauthenticated, user_msg, error.to_string()).with_source(error)
    }
}

impl From<tokio::time::error::Elapsed> for TollboothError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::with_internal(
            ErrorCode::StorageTimeout,
            "Storage operation timed out",
            error.to_string(),
        )
        .with_details(ErrorDetails::new().with_retry_after(1))
        .with_source(error)
    }
}

impl From<serde_json::Error> for TollboothError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::ValidationError,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<anyhow::Error> for TollboothError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<TollboothError>() {
            Ok(err) => err,
            Err(error) => Self::with_internal(
                ErrorCode::InternalError,
                "An internal error occurred",
                error.to_string(),
            ),
        }
    }
}

impl From<config::ConfigError> for TollboothError {
    fn from(error: config::ConfigError) -> Self {
        let user_msg = match &error {
            config::ConfigError::NotFound(_) => "Required configuration not found",
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => {
                "Configuration file is invalid"
            }
            _ => "Configuration error occurred",
        };

        Self::with_internal(ErrorCode::ConfigurationError, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Convenience Constructors for Domain Errors
// ═══════════════════════════════════════════════════════════════════════════════

impl TollboothError {
    /// Create a plan not found error.
    pub fn plan_not_found(plan_id: impl fmt::Display) -> Self {
        let id = plan_id.to_string();
        Self::new(ErrorCode::PlanNotFound, format!("Plan not found: {}", id))
            .with_details(ErrorDetails::new().with_entity("plan", id))
    }

    /// Create a permission not found error.
    pub fn permission_not_found(permission_id: impl fmt::Display) -> Self {
        let id = permission_id.to_string();
        Self::new(ErrorCode::PermissionNotFound, format!("Permission not found: {}", id))
            .with_details(ErrorDetails::new().with_entity("permission", id))
    }

    /// Create a principal not found error.
    pub fn principal_not_found(principal_id: impl fmt::Display) -> Self {
        let id = principal_id.to_string();
        Self::new(ErrorCode::PrincipalNotFound, format!("User not found: {}", id))
            .with_details(ErrorDetails::new().with_entity("user", id))
    }

    /// Create an unknown service error.
    pub fn service_not_found(service: impl Into<String>) -> Self {
        let name = service.into();
        Self::new(ErrorCode::ServiceNotFound, format!("Unknown service: {}", name))
            .with_details(ErrorDetails::new().with_entity("service", name))
    }

    /// Create an access denied error carrying the denial reason.
    pub fn access_denied(reason: DenialReason) -> Self {
        Self::new(ErrorCode::AccessDenied, reason.as_str())
            .with_details(ErrorDetails::new().with_reason(reason.as_str()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
