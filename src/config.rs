// Application configuration loaded from the environment
// Values are read once at startup and passed explicitly into the components that need them

use chrono::Duration;
use std::env;
use std::str::FromStr;

/// Startup configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ")]
    SharedSecret,
}

/// Token and session settings for the auth core
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Issue a new refresh token on every refresh and revoke the old one
    pub rotate_refresh_tokens: bool,
}

impl AuthConfig {
    pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
    pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

    /// Build a config with default lifetimes and rotation disabled
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(Self::DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(Self::DEFAULT_REFRESH_TTL_DAYS),
            rotate_refresh_tokens: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let access_secret = required("JWT_ACCESS_SECRET")?;
        let refresh_secret = required("JWT_REFRESH_SECRET")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_minutes: i64 =
            parsed_or("ACCESS_TOKEN_TTL_MINUTES", Self::DEFAULT_ACCESS_TTL_MINUTES)?;
        let refresh_days: i64 =
            parsed_or("REFRESH_TOKEN_TTL_DAYS", Self::DEFAULT_REFRESH_TTL_DAYS)?;
        positive("ACCESS_TOKEN_TTL_MINUTES", access_minutes)?;
        positive("REFRESH_TOKEN_TTL_DAYS", refresh_days)?;

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
            rotate_refresh_tokens: parsed_or("ROTATE_REFRESH_TOKENS", false)?,
        })
    }
}

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    /// Argon2id defaults from the argon2 crate (19 MiB, 2 passes, 1 lane)
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: parsed_or("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parsed_or("ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parsed_or("ARGON2_PARALLELISM", defaults.parallelism)?,
        })
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// In-memory stores are used when unset
    pub database_url: Option<String>,
    pub auth: AuthConfig,
    pub hashing: HashingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed_or("PORT", 8080)?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            auth: AuthConfig::from_env()?,
            hashing: HashingConfig::from_env()?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn positive(name: &'static str, value: i64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}
