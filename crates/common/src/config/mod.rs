//! Configuration management for Plenário services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Hostname to chamber resolution
    #[serde(default)]
    pub tenancy: TenancyConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Scheduled report runner
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Allowed CORS origins, empty means any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending SQL migrations at startup
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Lifetime of the token issued between password check and TOTP check
    #[serde(default = "default_two_factor_challenge")]
    pub two_factor_challenge_secs: u64,

    /// Issuer shown by authenticator apps
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,

    /// Minimum password length for new accounts
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    /// Integration token header name
    #[serde(default = "default_integration_token_header")]
    pub integration_token_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenancyConfig {
    /// Shared parent domain, `<slug>.<base_domain>` resolves to tenant `slug`
    pub base_domain: Option<String>,

    /// Tenant used when the host matches nothing (localhost, previews)
    pub default_tenant_slug: Option<String>,

    /// How long a resolved host stays cached
    #[serde(default = "default_tenant_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Accept the X-Tenant-Slug header in place of the Host header
    #[serde(default)]
    pub allow_header_override: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Expose /metrics
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,

    /// Service name attached to logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Login attempts per minute (per process)
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Key clients by `X-Forwarded-For`; only behind a proxy that sets it
    #[serde(default)]
    pub trust_forwarded: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Seconds between polls for due reports
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum reports executed per poll
    #[serde(default = "default_scheduler_batch")]
    pub batch_size: u64,

    /// Port of the scheduler's own Prometheus listener
    #[serde(default = "default_scheduler_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 256 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_jwt_expiration() -> u64 { 8 * 3600 }
fn default_two_factor_challenge() -> u64 { 300 }
fn default_totp_issuer() -> String { "Plenario".to_string() }
fn default_password_min_length() -> usize { 8 }
fn default_integration_token_header() -> String { "X-Integration-Token".to_string() }
fn default_tenant_cache_ttl() -> u64 { 300 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "plenario".to_string() }
fn default_login_per_minute() -> u32 { 30 }
fn default_burst() -> u32 { 10 }
fn default_enabled() -> bool { true }
fn default_poll_interval() -> u64 { 60 }
fn default_scheduler_batch() -> u64 { 20 }
fn default_scheduler_metrics_port() -> u16 { 9091 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
            two_factor_challenge_secs: default_two_factor_challenge(),
            totp_issuer: default_totp_issuer(),
            password_min_length: default_password_min_length(),
            integration_token_header: default_integration_token_header(),
        }
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            base_domain: None,
            default_tenant_slug: None,
            cache_ttl_secs: default_tenant_cache_ttl(),
            allow_header_override: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_enabled(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_per_minute: default_login_per_minute(),
            burst: default_burst(),
            enabled: default_enabled(),
            trust_forwarded: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_scheduler_batch(),
            metrics_port: default_scheduler_metrics_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate(&env)?;
        Ok(config)
    }

    /// Reject settings that only make sense in development
    fn validate(&self, env: &str) -> Result<(), ConfigError> {
        if env != "development" && env != "test" && self.auth.jwt_secret.is_none() {
            return Err(ConfigError::Message(
                "auth.jwt_secret must be set outside development".to_string(),
            ));
        }
        if self.tenancy.cache_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "tenancy.cache_ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// JWT secret, with a fixed development value when unset
    pub fn jwt_secret(&self) -> &str {
        self.auth
            .jwt_secret
            .as_deref()
            .unwrap_or("plenario-development-secret")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/plenario".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                run_migrations: false,
            },
            auth: AuthConfig::default(),
            tenancy: TenancyConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tenancy.cache_ttl_secs, 300);
        assert!(!config.tenancy.allow_header_override);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/plenario");
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let config = AppConfig::default();
        assert!(config.validate("production").is_err());
        assert!(config.validate("development").is_ok());

        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("s3cret".into());
        assert!(config.validate("production").is_ok());
        assert_eq!(config.jwt_secret(), "s3cret");
    }

    #[test]
    fn test_zero_cache_ttl_rejected() {
        let mut config = AppConfig::default();
        config.tenancy.cache_ttl_secs = 0;
        assert!(config.validate("development").is_err());
    }
}
