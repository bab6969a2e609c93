//! Configuration module
//!
//! Loads configuration from environment variables. The resulting `Config`
//! is passed explicitly to the constructors that need it.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Minimum accepted length of the token signing secret, in bytes
const MIN_JWT_SECRET_LEN: usize = 32;

/// Where rows are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Persistence backend
    pub storage: StorageBackend,

    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Apply embedded migrations at startup
    pub run_migrations: bool,

    /// Upper bound for every persistence call
    pub db_timeout: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Secret for signing access tokens
    pub jwt_secret: String,

    /// Access token lifetime
    pub access_token_ttl: Duration,

    /// Refresh token lifetime, strictly longer than the access token's
    pub refresh_token_ttl: Duration,

    /// Total refresh-token cache budget in bytes
    pub token_cache_capacity_bytes: u64,

    /// Origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage: StorageBackend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let config = Self {
            storage,
            database_url,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_env("RUN_MIGRATIONS", true)?,
            db_timeout: Duration::from_secs(parse_env("DB_TIMEOUT_SECS", 5)?),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("PORT", 3000)?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingEnv("JWT_SECRET"))?,
            access_token_ttl: Duration::from_secs(parse_env("ACCESS_TOKEN_TTL_SECS", 15 * 60)?),
            refresh_token_ttl: Duration::from_secs(parse_env(
                "REFRESH_TOKEN_TTL_SECS",
                30 * 24 * 60 * 60,
            )?),
            token_cache_capacity_bytes: parse_env("TOKEN_CACHE_CAPACITY_BYTES", 100 * 1024 * 1024)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:8080".to_string())
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }

    /// In-memory configuration for local runs and tests.
    pub fn development(jwt_secret: impl Into<String>) -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            run_migrations: false,
            db_timeout: Duration::from_secs(5),
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            token_cache_capacity_bytes: 16 * 1024 * 1024,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::InvalidValue("JWT_SECRET"));
        }
        if self.access_token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue("ACCESS_TOKEN_TTL_SECS"));
        }
        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(ConfigError::InvalidValue("REFRESH_TOKEN_TTL_SECS"));
        }
        if self.db_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("DB_TIMEOUT_SECS"));
        }
        if self.token_cache_capacity_bytes == 0 {
            return Err(ConfigError::InvalidValue("TOKEN_CACHE_CAPACITY_BYTES"));
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_development_config_is_valid() {
        assert!(Config::development(SECRET).validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = Config::development("short");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue("JWT_SECRET"))
        ));
    }

    #[test]
    fn test_refresh_ttl_must_exceed_access_ttl() {
        let mut config = Config::development(SECRET);
        config.refresh_token_ttl = config.access_token_ttl;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue("REFRESH_TOKEN_TTL_SECS"))
        ));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("PostgreSQL".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
