//! Role repository for database operations

use sqlx::PgPool;
use tracing::info;

use super::role_from_row;
use crate::error::{RbacError, RbacResult};
use crate::models::{NewRole, Role};
use crate::store::{CrudStore, Entity};

/// Role repository
#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CrudStore<Role> for RoleRepository {
    async fn create(&self, new_role: &NewRole) -> RbacResult<Role> {
        info!("Creating new role: {}", new_role.name);

        let row = sqlx::query(
            r#"
            INSERT INTO roles (role_name)
            VALUES ($1)
            RETURNING role_id, role_name, created_date, updated_date
            "#,
        )
        .bind(&new_role.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(Role::KIND, e))?;

        Ok(role_from_row(&row))
    }

    async fn get(&self, id: i32) -> RbacResult<Role> {
        let row = sqlx::query(
            "SELECT role_id, role_name, created_date, updated_date FROM roles WHERE role_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(role_from_row)
            .ok_or(RbacError::NotFound(Role::KIND))
    }

    async fn update(&self, id: i32, changes: &NewRole) -> RbacResult<Role> {
        info!("Renaming role {} to {}", id, changes.name);

        let row = sqlx::query(
            r#"
            UPDATE roles SET role_name = $1, updated_date = NOW()
            WHERE role_id = $2
            RETURNING role_id, role_name, created_date, updated_date
            "#,
        )
        .bind(&changes.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(Role::KIND, e))?;

        row.as_ref()
            .map(role_from_row)
            .ok_or(RbacError::NotFound(Role::KIND))
    }

    async fn delete(&self, id: i32) -> RbacResult<()> {
        info!("Deleting role {}", id);

        // access_role and user_roles rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM roles WHERE role_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::NotFound(Role::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT role_id, role_name, created_date, updated_date FROM roles ORDER BY role_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(role_from_row).collect())
    }
}
