//! Configuration management.
//!
//! Values come from an optional file and then from `TOLLBOOTH__*`
//! environment variables, e.g. `TOLLBOOTH__DATABASE__URL` or
//! `TOLLBOOTH__STORAGE__TIMEOUT=500ms`.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, TollboothError};
use crate::models::{ServiceVocabulary, DEFAULT_SERVICES};

const ENV_PREFIX: &str = "TOLLBOOTH";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Storage backend selection and call bounds
    #[serde(default)]
    pub storage: StorageConfig,

    /// Token issuance
    #[serde(default)]
    pub auth: AuthConfig,

    /// Service vocabulary
    #[serde(default)]
    pub access: AccessConfig,

    /// Startup seeding
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// How long to wait for a pooled connection
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Upper bound on a single storage call
    #[serde(default = "default_storage_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            timeout: default_storage_timeout(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime
    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,

    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl: default_token_ttl(),
            issuer: default_issuer(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Service names callers may ask for
    #[serde(default = "default_services")]
    pub services: Vec<String>,
}

impl AccessConfig {
    pub fn vocabulary(&self) -> ServiceVocabulary {
        ServiceVocabulary::new(self.services.iter().cloned())
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            services: default_services(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// Seeding of the admin is skipped when unset
    #[serde(default)]
    pub admin_password: Option<String>,

    #[serde(default = "default_plan_name")]
    pub default_plan_name: String,

    #[serde(default = "default_plan_description")]
    pub default_plan_description: String,

    #[serde(default = "default_plan_services")]
    pub default_plan_services: String,

    #[serde(default = "default_plan_limit")]
    pub default_plan_limit: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            admin_username: default_admin_username(),
            admin_password: None,
            default_plan_name: default_plan_name(),
            default_plan_description: default_plan_description(),
            default_plan_services: default_plan_services(),
            default_plan_limit: default_plan_limit(),
        }
    }
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("enabled", &self.enabled)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "[REDACTED]"))
            .field("default_plan_name", &self.default_plan_name)
            .field("default_plan_services", &self.default_plan_services)
            .field("default_plan_limit", &self.default_plan_limit)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// OpenTelemetry OTLP endpoint
    pub otlp_endpoint: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_true")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: default_log_level(),
            json_logging: default_true(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_database_url() -> String { "postgres://localhost/tollbooth".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 1 }
fn default_acquire_timeout() -> Duration { Duration::from_secs(5) }
fn default_backend() -> StorageBackend { StorageBackend::Postgres }
fn default_storage_timeout() -> Duration { Duration::from_secs(2) }
fn default_token_ttl() -> Duration { Duration::from_secs(3600) }
fn default_issuer() -> String { "tollbooth".to_string() }
fn default_services() -> Vec<String> { DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect() }
fn default_true() -> bool { true }
fn default_admin_username() -> String { "admin".to_string() }
fn default_plan_name() -> String { "Basic".to_string() }
fn default_plan_description() -> String { "Basic plan".to_string() }
fn default_plan_services() -> String { "storage,compute".to_string() }
fn default_plan_limit() -> u64 { 100 }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from the environment, layered over `path` when given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("access.services"),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(TollboothError::configuration("auth.jwt_secret must be set"));
        }
        if self.access.services.is_empty() {
            return Err(TollboothError::configuration(
                "access.services must name at least one service",
            ));
        }
        if self.storage.timeout.is_zero() {
            return Err(TollboothError::configuration("storage.timeout must be positive"));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert_eq!(cfg.storage.timeout, Duration::from_secs(2));
        assert_eq!(cfg.access.services.len(), 6);
        assert_eq!(cfg.bootstrap.default_plan_services, "storage,compute");
        assert_eq!(cfg.bootstrap.default_plan_limit, 100);
    }

    #[test]
    fn test_validate_requires_secret() {
        let err = Config::default().validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);

        let mut cfg = Config::default();
        cfg.auth.jwt_secret = "s".into();
        assert!(cfg.validate().is_ok());

        cfg.access.services.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[auth]
jwt_secret = "from-file"
token_ttl = "15m"

[storage]
backend = "memory"
timeout = "250ms"

[access]
services = ["storage", "ai"]
"#
        )
        .unwrap();

        let cfg = Config::load(file.path().to_str()).unwrap();
        assert_eq!(cfg.auth.jwt_secret, "from-file");
        assert_eq!(cfg.auth.token_ttl, Duration::from_secs(900));
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.storage.timeout, Duration::from_millis(250));
        assert!(cfg.access.vocabulary().contains("ai"));
        assert!(!cfg.access.vocabulary().contains("compute"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = "hunter2".into();
        cfg.bootstrap.admin_password = Some("hunter3".into());
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("hunter3"));
    }
}
