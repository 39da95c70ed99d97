//! Access repository for database operations

use sqlx::PgPool;
use tracing::info;

use super::access_from_row;
use crate::error::{RbacError, RbacResult};
use crate::models::{Access, NewAccess};
use crate::store::{CrudStore, Entity};

/// Access repository
#[derive(Clone)]
pub struct AccessRepository {
    pool: PgPool,
}

impl AccessRepository {
    /// Create a new access repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CrudStore<Access> for AccessRepository {
    async fn create(&self, new_access: &NewAccess) -> RbacResult<Access> {
        info!("Creating new access: {}", new_access.name);

        let row = sqlx::query(
            r#"
            INSERT INTO access (access_name)
            VALUES ($1)
            RETURNING access_id, access_name, created_date, updated_date
            "#,
        )
        .bind(&new_access.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(Access::KIND, e))?;

        Ok(access_from_row(&row))
    }

    async fn get(&self, id: i32) -> RbacResult<Access> {
        let row = sqlx::query(
            r#"
            SELECT access_id, access_name, created_date, updated_date
            FROM access
            WHERE access_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(access_from_row)
            .ok_or(RbacError::NotFound(Access::KIND))
    }

    async fn update(&self, id: i32, changes: &NewAccess) -> RbacResult<Access> {
        info!("Renaming access {} to {}", id, changes.name);

        let row = sqlx::query(
            r#"
            UPDATE access SET access_name = $1, updated_date = NOW()
            WHERE access_id = $2
            RETURNING access_id, access_name, created_date, updated_date
            "#,
        )
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(Access::KIND, e))?;

        row.as_ref()
            .map(access_from_row)
            .ok_or(RbacError::NotFound(Access::KIND))
    }

    async fn delete(&self, id: i32) -> RbacResult<()> {
        info!("Deleting access {}", id);

        let result = sqlx::query("DELETE FROM access WHERE access_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::NotFound(Access::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<Access>> {
        let rows = sqlx::query(
            r#"
            SELECT access_id, access_name, created_date, updated_date
            FROM access
            ORDER BY access_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(access_from_row).collect())
    }
}
