//! PostgreSQL pool setup.

use crate::error::{Result, SyncError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Open a pool against `database_url` and check it with `SELECT 1`.
pub async fn init_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(|e| SyncError::Database(format!("Failed to connect: {}", e)))?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| SyncError::Database(format!("Connection check failed: {}", e)))?;

    info!("Connected to PostgreSQL ({} max connections)", MAX_CONNECTIONS);
    Ok(pool)
}
