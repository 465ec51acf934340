//! PostgreSQL connection management for the campaign backend
//!
//! Provides pool configuration, connection helpers with retry, and a
//! health check used by readiness probes.
//!
//! # Example
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::postgres::{PostgresConfig, connect_from_config_with_retry};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = connect_from_config_with_retry(config, None).await?;
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
