//! Postgres bootstrap for the RBAC service

use anyhow::Result;
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use sqlx::{PgPool, migrate::Migrator};
use tracing::info;

/// Schema for users, roles, accesses and their associations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open the pool, check connectivity and bring the schema up to date
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = init_pool(config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, &MIGRATOR).await?;
    info!("Database schema is up to date");

    Ok(pool)
}
