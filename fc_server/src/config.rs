//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use fast_cms::{auth::AuthConfig, db::DatabaseConfig, seed::SuperAdmin};
use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

/// Default upload limit for images: 3 MiB
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 3 * 1024 * 1024;

/// Longest accepted token lifetime: one year
pub const MAX_TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 365;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Application name shown by the root endpoint
    pub app_name: String,
    pub environment: Environment,
    pub debug: bool,
    /// Server bind address
    pub bind: SocketAddr,
    /// Prefix every API route is nested under, e.g. `/api`
    pub api_prefix: String,
    /// Allowed CORS origin; `None` disables CORS
    pub frontend_url: Option<String>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Bootstrap super-admin account
    pub super_admin: SuperAdmin,
    /// Filesystem layout and upload limits
    pub storage: StorageSettings,
    /// Prometheus exporter address; `None` disables the exporter
    pub metrics_bind: Option<SocketAddr>,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub secret_key: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("secret_key", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .finish()
    }
}

/// Directories the server reads and writes, plus upload limits
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    /// Served under `/static`
    pub static_dir: PathBuf,
    pub avatar_dir: PathBuf,
    pub post_images_dir: PathBuf,
    /// Maximum accepted image upload, in bytes
    pub max_image_size: usize,
}

impl StorageSettings {
    /// Layout rooted at the given data and static directories
    pub fn new(data_dir: PathBuf, static_dir: PathBuf, max_image_size: usize) -> Self {
        Self {
            avatar_dir: static_dir.join("avatars"),
            post_images_dir: static_dir.join("posts"),
            data_dir,
            static_dir,
            max_image_size,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let environment = match std::env::var("APP_ENV") {
            Err(_) => Environment::Development,
            Ok(value) => match value.to_lowercase().as_str() {
                "development" | "dev" => Environment::Development,
                "production" | "prod" => Environment::Production,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "APP_ENV".to_string(),
                        reason: format!("Expected 'development' or 'production', got '{value}'"),
                    });
                }
            },
        };

        // Bind address
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
                let ip: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
                    var: "HOST".to_string(),
                    reason: format!("'{host}' is not an IP address"),
                })?;
                SocketAddr::new(ip, parse_env_or("PORT", 8080))
            }
        };

        // Storage layout
        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        let static_dir =
            PathBuf::from(std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()));
        let storage = StorageSettings::new(
            data_dir,
            static_dir,
            parse_env_or("MAX_IMAGE_SIZE", DEFAULT_MAX_IMAGE_SIZE),
        );

        // Database configuration; the default file lives under DATA_DIR
        let mut database = DatabaseConfig::from_env();
        database.database_url = database_url_override
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| format!("sqlite://{}", storage.data_dir.join("dev.db").display()));

        // Security configuration (REQUIRED)
        let secret_key = std::env::var("SECRET_KEY").map_err(|_| ConfigError::MissingRequired {
            var: "SECRET_KEY".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        if secret_key.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "SECRET_KEY".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        let security = SecurityConfig {
            secret_key,
            access_token_ttl_secs: parse_env_or("ACCESS_TOKEN_EXPIRE_SECONDS", 60 * 15),
            refresh_token_ttl_secs: parse_env_or(
                "REFRESH_TOKEN_EXPIRE_SECONDS",
                60 * 60 * 24 * 7,
            ),
        };

        let default_admin = SuperAdmin::default();
        let super_admin = SuperAdmin {
            username: std::env::var("SUPERADMIN_NAME").unwrap_or(default_admin.username),
            email: std::env::var("SUPERADMIN_EMAIL").unwrap_or(default_admin.email),
            password: std::env::var("SUPERADMIN_PASSWORD").unwrap_or(default_admin.password),
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.is_empty() => {
                Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{value}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        Ok(ServerConfig {
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "FastCMS".to_string()),
            environment,
            debug: parse_env_or("DEBUG", environment == Environment::Development),
            bind,
            api_prefix: std::env::var("API_STR").unwrap_or_else(|_| "/api".to_string()),
            frontend_url: (!frontend_url.is_empty()).then_some(frontend_url),
            database,
            security,
            super_admin,
            storage,
            metrics_bind,
        })
    }

    /// Development defaults rooted at `root`, without reading the environment.
    ///
    /// The database URL points at an in-memory SQLite database and CORS is
    /// disabled.
    pub fn development(secret_key: impl Into<String>, root: &Path) -> Self {
        ServerConfig {
            app_name: "FastCMS".to_string(),
            environment: Environment::Development,
            debug: true,
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            api_prefix: "/api".to_string(),
            frontend_url: None,
            database: DatabaseConfig {
                database_url: "sqlite::memory:".to_string(),
                ..DatabaseConfig::development()
            },
            security: SecurityConfig {
                secret_key: secret_key.into(),
                access_token_ttl_secs: 60 * 15,
                refresh_token_ttl_secs: 60 * 60 * 24 * 7,
            },
            super_admin: SuperAdmin::default(),
            storage: StorageSettings::new(
                root.join("data"),
                root.join("static"),
                DEFAULT_MAX_IMAGE_SIZE,
            ),
            metrics_bind: None,
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_prefix.starts_with('/')
            || self.api_prefix.len() < 2
            || self.api_prefix.ends_with('/')
        {
            return Err(ConfigError::Invalid {
                var: "API_STR".to_string(),
                reason: "Must start with '/', not end with '/', and not be the root".to_string(),
            });
        }

        if self.security.access_token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_SECONDS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        for (var, ttl) in [
            ("ACCESS_TOKEN_EXPIRE_SECONDS", self.security.access_token_ttl_secs),
            ("REFRESH_TOKEN_EXPIRE_SECONDS", self.security.refresh_token_ttl_secs),
        ] {
            if ttl > MAX_TOKEN_TTL_SECS {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must be at most {MAX_TOKEN_TTL_SECS} seconds"),
                });
            }
        }

        if self.security.refresh_token_ttl_secs <= self.security.access_token_ttl_secs {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_EXPIRE_SECONDS".to_string(),
                reason: format!(
                    "Must be greater than the access token lifetime ({})",
                    self.security.access_token_ttl_secs
                ),
            });
        }

        if self.storage.max_image_size == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_IMAGE_SIZE".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.max_connections == 0
            || self.database.min_connections > self.database.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: format!(
                    "Must be at least 1 and at least DB_MIN_CONNECTIONS ({})",
                    self.database.min_connections
                ),
            });
        }

        Ok(())
    }

    /// Token settings handed to the auth manager.
    ///
    /// Lifetimes are capped at [`MAX_TOKEN_TTL_SECS`].
    pub fn auth_config(&self) -> AuthConfig {
        let ttl = |secs: i64| chrono::Duration::seconds(secs.min(MAX_TOKEN_TTL_SECS));
        let mut config = AuthConfig::new(self.security.secret_key.clone());
        config.access_token_ttl = ttl(self.security.access_token_ttl_secs);
        config.refresh_token_ttl = ttl(self.security.refresh_token_ttl_secs);
        config
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
