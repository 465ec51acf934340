use crate::{env_or_default, ConfigError, FromEnv};

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
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

/// Campaign delivery settings
///
/// Controls batching, pacing, and retry ceilings for the send pipeline.
#[derive(Clone, Debug)]
pub struct SendingConfig {
    /// Number of messages per delivery chunk
    pub batch_size: usize,
    /// Upper bound on messages handed to the provider per second
    pub rate_limit_per_second: u32,
    /// Retry ceiling for transient delivery failures
    pub max_retry_attempts: u32,
    /// Public base URL of the frontend, used for unsubscribe links
    pub app_base_url: String,
}

impl FromEnv for SendingConfig {
    /// Reads from environment variables with sensible defaults:
    /// - EMAIL_BATCH_SIZE: defaults to 100
    /// - EMAIL_RATE_LIMIT_PER_SECOND: defaults to 10
    /// - EMAIL_MAX_RETRY_ATTEMPTS: defaults to 3
    /// - APP_BASE_URL: defaults to http://localhost:3000
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            batch_size: parse_var("EMAIL_BATCH_SIZE", "100")?,
            rate_limit_per_second: parse_var("EMAIL_RATE_LIMIT_PER_SECOND", "10")?,
            max_retry_attempts: parse_var("EMAIL_MAX_RETRY_ATTEMPTS", "3")?,
            app_base_url: env_or_default("APP_BASE_URL", "http://localhost:3000"),
        })
    }
}

impl Default for SendingConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            rate_limit_per_second: 10,
            max_retry_attempts: 3,
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Open/click tracking settings
///
/// The secret feeds deterministic token derivation, so rotating it
/// invalidates tracking links already embedded in delivered mail.
#[derive(Clone, Debug)]
pub struct TrackingConfig {
    /// Public base URL of the API, used for pixel and redirect links
    pub api_base_url: String,
    /// Secret mixed into tracking tokens
    pub secret: String,
}

impl FromEnv for TrackingConfig {
    /// Reads from environment variables with sensible defaults:
    /// - API_BASE_URL: defaults to http://localhost:8080
    /// - TRACKING_SECRET: defaults to "change-me" (set a real value in production)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: env_or_default("API_BASE_URL", "http://localhost:8080"),
            secret: env_or_default("TRACKING_SECRET", "change-me"),
        })
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            secret: "change-me".to_string(),
        }
    }
}
