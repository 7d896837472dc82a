use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

/// Idempotent DDL for every table the API touches.
const SCHEMA_SQL: &str = include_str!("../schema.sql");

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Runs the bundled `CREATE TABLE IF NOT EXISTS` script.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    pool.execute(SCHEMA_SQL)
        .await
        .context("Failed to apply database schema")?;
    info!("Database schema verified");
    Ok(())
}
