use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::debug;

use crate::common::{DatabaseError, DatabaseResult};

/// Verify the connection is alive with a `SELECT 1`
///
/// Backs the `/ready` probe in the API binary.
pub async fn check_health(db: &DatabaseConnection) -> DatabaseResult<()> {
    debug!("Running PostgreSQL health check");

    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    db.query_one_raw(stmt)
        .await
        .map_err(|e| DatabaseError::HealthCheck(e.to_string()))?;

    Ok(())
}
