use sea_orm::ConnectOptions;
use std::time::Duration;
use tracing::log::LevelFilter;

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_required};

/// PostgreSQL connection pool configuration
///
/// Construct manually or, with the `config` feature, load from environment
/// variables and convert into `ConnectOptions` for the connector.
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    /// Database connection URL (required)
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,

    /// Connection idle timeout in seconds
    pub idle_timeout_secs: u64,

    /// Connection max lifetime in seconds
    pub max_lifetime_secs: u64,

    /// Enable SQL query logging
    pub sqlx_logging: bool,

    /// SQL logging level
    pub sqlx_logging_level: LevelFilter,
}

impl PostgresConfig {
    /// Create a config with default pool settings for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Convert this config into SeaORM ConnectOptions
    pub fn into_connect_options(self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(&self.url);
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .sqlx_logging(self.sqlx_logging)
            .sqlx_logging_level(self.sqlx_logging_level);
        opt
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 100,
            min_connections: 5,
            connect_timeout_secs: 8,
            acquire_timeout_secs: 8,
            idle_timeout_secs: 8,
            max_lifetime_secs: 8,
            sqlx_logging: true,
            sqlx_logging_level: LevelFilter::Info,
        }
    }
}

#[cfg(feature = "config")]
fn env_parsed<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    env_or_default(key, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("{}", e),
        })
}

/// Load PostgresConfig from environment variables
///
/// - `DATABASE_URL` (required)
/// - `DB_MAX_CONNECTIONS` (default 100), `DB_MIN_CONNECTIONS` (default 5)
/// - `DB_CONNECT_TIMEOUT_SECS` / `DB_ACQUIRE_TIMEOUT_SECS` /
///   `DB_IDLE_TIMEOUT_SECS` / `DB_MAX_LIFETIME_SECS` (default 8)
/// - `DB_SQLX_LOGGING` (default true)
#[cfg(feature = "config")]
impl FromEnv for PostgresConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parsed("DB_MAX_CONNECTIONS", "100")?,
            min_connections: env_parsed("DB_MIN_CONNECTIONS", "5")?,
            connect_timeout_secs: env_parsed("DB_CONNECT_TIMEOUT_SECS", "8")?,
            acquire_timeout_secs: env_parsed("DB_ACQUIRE_TIMEOUT_SECS", "8")?,
            idle_timeout_secs: env_parsed("DB_IDLE_TIMEOUT_SECS", "8")?,
            max_lifetime_secs: env_parsed("DB_MAX_LIFETIME_SECS", "8")?,
            sqlx_logging: env_parsed("DB_SQLX_LOGGING", "true")?,
            sqlx_logging_level: LevelFilter::Info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_pool_settings() {
        let config = PostgresConfig::new("postgresql://localhost/test");
        assert_eq!(config.url, "postgresql://localhost/test");
        assert_eq!(config.max_connections, 100);
        assert_eq!(config.min_connections, 5);
    }

    #[cfg(feature = "config")]
    #[test]
    fn from_env_minimal() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/testdb")),
                ("DB_MAX_CONNECTIONS", None),
            ],
            || {
                let config = PostgresConfig::from_env().unwrap();
                assert_eq!(config.url, "postgresql://localhost/testdb");
                assert_eq!(config.max_connections, 100);
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn from_env_custom_pool() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/testdb")),
                ("DB_MAX_CONNECTIONS", Some("50")),
                ("DB_MIN_CONNECTIONS", Some("10")),
            ],
            || {
                let config = PostgresConfig::from_env().unwrap();
                assert_eq!(config.max_connections, 50);
                assert_eq!(config.min_connections, 10);
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn from_env_missing_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = PostgresConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
        });
    }

    #[cfg(feature = "config")]
    #[test]
    fn from_env_invalid_number() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/testdb")),
                ("DB_MAX_CONNECTIONS", Some("invalid")),
            ],
            || {
                let err = PostgresConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
            },
        );
    }
}
