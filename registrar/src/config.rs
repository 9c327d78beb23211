//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides.
//! The configuration file path defaults to `config.yaml` but can be specified
//! via `-f` flag or the `REGISTRAR_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `REGISTRAR_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables.
//! For example, `REGISTRAR_AUTH__NATIVE__ENABLED=false` sets `auth.native.enabled`.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "REGISTRAR_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment
/// variables. All fields have sensible defaults defined in the `Default`
/// implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Convenience override for `database.url`, normally set via DATABASE_URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Email address for the initial admin user (created on first startup)
    pub admin_email: String,
    /// Password for the initial admin user (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for JWT signing (required when native auth is enabled)
    pub secret_key: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Attendance reporting configuration
    pub attendance: AttendanceConfig,
    /// Finance configuration
    pub finance: FinanceConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            database: DatabaseConfig::default(),
            admin_email: "admin@school.local".to_string(),
            admin_password: None,
            secret_key: None,
            auth: AuthConfig::default(),
            attendance: AttendanceConfig::default(),
            finance: FinanceConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string for the database
    pub url: String,
    /// Connection pool settings
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/registrar".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool settings with all SQLx parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
}

impl Default for PoolSettings {
    /// Production defaults: balanced for reliability and resource usage
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600, // 10 minutes
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Native username/password authentication
    pub native: NativeAuthConfig,
    /// Security settings (JWT, CORS)
    pub security: SecurityConfig,
}

/// Native username/password authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeAuthConfig {
    /// Enable native authentication (login/registration)
    pub enabled: bool,
    /// Allow new users to self-register (student accounts only)
    pub allow_registration: bool,
    /// Password validation rules
    pub password: PasswordConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
    /// Login lockout rules
    pub lockout: LockoutConfig,
}

impl Default for NativeAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_registration: false,
            password: PasswordConfig::default(),
            session: SessionConfig::default(),
            lockout: LockoutConfig::default(),
        }
    }
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            argon2_memory_kib: 19456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Set Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "registrar_session".to_string(),
            cookie_secure: true,
            cookie_same_site: "strict".to_string(),
        }
    }
}

/// Login lockout rules.
///
/// After `max_failed_attempts` consecutive failures the account is locked for
/// `lock_duration`; a successful login resets the counter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockoutConfig {
    /// Consecutive failures before the account is locked
    pub max_failed_attempts: i32,
    /// How long a locked account stays locked
    #[serde(with = "humantime_serde")]
    pub lock_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::from_secs(30 * 60),
        }
    }
}

/// Security configuration for JWT and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// JWT token expiry duration
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_expiry: Duration::from_secs(8 * 60 * 60),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests ("*" for any)
    pub allowed_origins: Vec<String>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
            max_age: Some(3600),
        }
    }
}

/// Attendance reporting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttendanceConfig {
    /// Default attendance percentage below which a student is a defaulter
    pub defaulter_threshold: Decimal,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            defaulter_threshold: Decimal::new(75, 0),
        }
    }
}

/// Finance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceConfig {
    /// Days until a freshly generated invoice falls due
    pub invoice_due_days: i64,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self { invoice_due_days: 30 }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // if database_url is set, use it (preserving existing pool settings)
        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("REGISTRAR_").split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database_url".into()))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.auth.native.enabled {
            if self.secret_key.is_none() {
                return Err(Error::Internal {
                    operation: "Config validation: Native authentication is enabled but secret_key is not configured. \
                     Please set REGISTRAR_SECRET_KEY environment variable or add secret_key to config file."
                        .to_string(),
                });
            }

            if self.auth.native.password.min_length > self.auth.native.password.max_length {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                        self.auth.native.password.min_length, self.auth.native.password.max_length
                    ),
                });
            }

            if self.auth.native.password.min_length < 1 {
                return Err(Error::Internal {
                    operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
                });
            }

            if self.auth.native.lockout.max_failed_attempts < 1 {
                return Err(Error::Internal {
                    operation: "Config validation: lockout.max_failed_attempts must be at least 1".to_string(),
                });
            }
        }

        // Validate JWT expiry duration is reasonable
        if self.auth.security.jwt_expiry.as_secs() < 300 {
            // Less than 5 minutes
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too short (minimum 5 minutes)".to_string(),
            });
        }

        if self.auth.security.jwt_expiry.as_secs() > 86400 * 30 {
            // More than 30 days
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too long (maximum 30 days)".to_string(),
            });
        }

        // Validate CORS configuration
        if self.auth.security.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let has_wildcard = self.auth.security.cors.allowed_origins.iter().any(|origin| origin == "*");
        if has_wildcard && self.auth.security.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        if self.attendance.defaulter_threshold < Decimal::ZERO || self.attendance.defaulter_threshold > Decimal::new(100, 0) {
            return Err(Error::Internal {
                operation: "Config validation: attendance.defaulter_threshold must be between 0 and 100".to_string(),
            });
        }

        if self.finance.invoice_due_days < 1 {
            return Err(Error::Internal {
                operation: "Config validation: finance.invoice_due_days must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
secret_key: hello
port: 8080
attendance:
  defaulter_threshold: 80
auth:
  native:
    lockout:
      max_failed_attempts: 3
      lock_duration: 15m
"#,
            )?;

            let args = Args {
                config: "test.yaml".to_string(),
                validate: false,
            };

            let config = Config::load(&args)?;

            assert_eq!(config.port, 8080);
            assert_eq!(config.attendance.defaulter_threshold, Decimal::new(80, 0));
            assert_eq!(config.auth.native.lockout.max_failed_attempts, 3);
            assert_eq!(config.auth.native.lockout.lock_duration, Duration::from_secs(15 * 60));
            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "secret_key: hello\n")?;
            jail.set_env("DATABASE_URL", "postgres://db.internal:5432/school");

            let args = Args {
                config: "test.yaml".to_string(),
                validate: false,
            };

            let config = Config::load(&args)?;
            assert_eq!(config.database.url, "postgres://db.internal:5432/school");
            Ok(())
        });
    }

    #[test]
    fn test_native_auth_requires_secret_key() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 8080\n")?;

            let args = Args {
                config: "test.yaml".to_string(),
                validate: false,
            };

            assert!(Config::load(&args).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_wildcard_cors_with_credentials_rejected() {
        let mut config = Config {
            secret_key: Some("k".to_string()),
            ..Default::default()
        };
        config.auth.security.cors.allow_credentials = true;
        assert!(config.validate().is_err());
    }
}
