//! Role access repository: grants of accesses to roles

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use super::access_from_row;
use crate::error::{RbacError, RbacResult};
use crate::models::{Access, NewRoleAccess, RoleAccess};
use crate::store::{CrudStore, Entity, RoleAccessStore};

/// Role access repository
#[derive(Clone)]
pub struct RoleAccessRepository {
    pool: PgPool,
}

impl RoleAccessRepository {
    /// Create a new role access repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_access_from_row(row: &PgRow) -> RoleAccess {
    RoleAccess {
        role_id: row.get("role_id"),
        access_id: row.get("access_id"),
        created_at: row.get("created_date"),
        updated_at: row.get("updated_date"),
    }
}

impl CrudStore<RoleAccess> for RoleAccessRepository {
    async fn create(&self, new: &NewRoleAccess) -> RbacResult<RoleAccess> {
        info!("Granting access {} to role {}", new.access_id, new.role_id);

        let row = sqlx::query(
            r#"
            INSERT INTO access_role (role_id, access_id)
            VALUES ($1, $2)
            RETURNING role_id, access_id, created_date, updated_date
            "#,
        )
        .bind(new.role_id)
        .bind(new.access_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(RoleAccess::KIND, e))?;

        Ok(role_access_from_row(&row))
    }

    async fn get(&self, (role_id, access_id): (i32, i32)) -> RbacResult<RoleAccess> {
        let row = sqlx::query(
            r#"
            SELECT role_id, access_id, created_date, updated_date
            FROM access_role
            WHERE role_id = $1 AND access_id = $2
            "#,
        )
        .bind(role_id)
        .bind(access_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(role_access_from_row)
            .ok_or(RbacError::NotFound(RoleAccess::KIND))
    }

    async fn update(
        &self,
        (role_id, access_id): (i32, i32),
        changes: &NewRoleAccess,
    ) -> RbacResult<RoleAccess> {
        info!(
            "Moving grant ({}, {}) to ({}, {})",
            role_id, access_id, changes.role_id, changes.access_id
        );

        let row = sqlx::query(
            r#"
            UPDATE access_role SET role_id = $1, access_id = $2, updated_date = NOW()
            WHERE role_id = $3 AND access_id = $4
            RETURNING role_id, access_id, created_date, updated_date
            "#,
        )
        .bind(changes.role_id)
        .bind(changes.access_id)
        .bind(role_id)
        .bind(access_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(RoleAccess::KIND, e))?;

        row.as_ref()
            .map(role_access_from_row)
            .ok_or(RbacError::NotFound(RoleAccess::KIND))
    }

    async fn delete(&self, (role_id, access_id): (i32, i32)) -> RbacResult<()> {
        info!("Revoking access {} from role {}", access_id, role_id);

        let result = sqlx::query("DELETE FROM access_role WHERE role_id = $1 AND access_id = $2")
            .bind(role_id)
            .bind(access_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::NotFound(RoleAccess::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<RoleAccess>> {
        let rows = sqlx::query(
            r#"
            SELECT role_id, access_id, created_date, updated_date
            FROM access_role
            ORDER BY created_date, role_id, access_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(role_access_from_row).collect())
    }
}

impl RoleAccessStore for RoleAccessRepository {
    async fn accesses_for_role(&self, role_id: i32) -> RbacResult<Vec<Access>> {
        let rows = sqlx::query(
            r#"
            SELECT a.access_id, a.access_name, a.created_date, a.updated_date
            FROM access a
            INNER JOIN access_role ar ON a.access_id = ar.access_id
            WHERE ar.role_id = $1
            ORDER BY a.access_id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(access_from_row).collect())
    }
}
