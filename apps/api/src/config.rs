//! Configuration for the Campaign API

use core_config::FromEnv;
use core_config::sending::{SendingConfig, TrackingConfig};
use core_config::server::ServerConfig;
use database::postgres::PostgresConfig;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub sending: SendingConfig,
    pub tracking: TrackingConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?;
        let server = ServerConfig::from_env()?;
        let sending = SendingConfig::from_env()?;
        let tracking = TrackingConfig::from_env()?;

        Ok(Self {
            database,
            server,
            sending,
            tracking,
            environment,
        })
    }
}
