/// Errors surfaced by the connection and health check helpers
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Establishing a connection failed, after retries where configured
    #[error("connection failed: {0}")]
    Connection(#[source] sea_orm::DbErr),

    /// The health check query did not complete
    #[error("health check failed: {0}")]
    HealthCheck(String),
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
