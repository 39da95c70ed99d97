//! User role repository: memberships and the joined access view

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use super::{access_from_row, role_from_row};
use crate::error::{RbacError, RbacResult};
use crate::models::{Access, NewUserRole, Role, UpdateUserRole, UserRole};
use crate::store::{CrudStore, Entity, UserRoleStore};

/// User role repository
#[derive(Clone)]
pub struct UserRoleRepository {
    pool: PgPool,
}

impl UserRoleRepository {
    /// Create a new user role repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_role_from_row(row: &PgRow) -> UserRole {
    UserRole {
        user_id: row.get("user_id"),
        role_id: row.get("role_id"),
        expires_at: row.get("expiry_date"),
        created_at: row.get("created_date"),
        updated_at: row.get("updated_date"),
    }
}

impl CrudStore<UserRole> for UserRoleRepository {
    async fn create(&self, new: &NewUserRole) -> RbacResult<UserRole> {
        info!("Assigning role {} to user {}", new.role_id, new.user_id);

        let row = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, expiry_date)
            VALUES ($1, $2, $3)
            RETURNING user_id, role_id, expiry_date, created_date, updated_date
            "#,
        )
        .bind(new.user_id)
        .bind(new.role_id)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(UserRole::KIND, e))?;

        Ok(user_role_from_row(&row))
    }

    async fn get(&self, (user_id, role_id): (i32, i32)) -> RbacResult<UserRole> {
        let row = sqlx::query(
            r#"
            SELECT user_id, role_id, expiry_date, created_date, updated_date
            FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(user_role_from_row)
            .ok_or(RbacError::NotFound(UserRole::KIND))
    }

    async fn update(
        &self,
        (user_id, role_id): (i32, i32),
        changes: &UpdateUserRole,
    ) -> RbacResult<UserRole> {
        info!("Updating expiry of role {} for user {}", role_id, user_id);

        let row = sqlx::query(
            r#"
            UPDATE user_roles SET expiry_date = $1, updated_date = NOW()
            WHERE user_id = $2 AND role_id = $3
            RETURNING user_id, role_id, expiry_date, created_date, updated_date
            "#,
        )
        .bind(changes.expires_at)
        .bind(user_id)
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(user_role_from_row)
            .ok_or(RbacError::NotFound(UserRole::KIND))
    }

    async fn delete(&self, (user_id, role_id): (i32, i32)) -> RbacResult<()> {
        info!("Removing role {} from user {}", role_id, user_id);

        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::NotFound(UserRole::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<UserRole>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, role_id, expiry_date, created_date, updated_date
            FROM user_roles
            ORDER BY created_date, user_id, role_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_role_from_row).collect())
    }
}

impl UserRoleStore for UserRoleRepository {
    async fn roles_for_user(&self, user_id: i32) -> RbacResult<Vec<Role>> {
        let rows = sqlx::query(
            r#"
            SELECT r.role_id, r.role_name, r.created_date, r.updated_date
            FROM roles r
            INNER JOIN user_roles ur ON r.role_id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.role_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(role_from_row).collect())
    }

    async fn all_access(
        &self,
        user_id: i32,
        active_at: Option<DateTime<Utc>>,
    ) -> RbacResult<Vec<Access>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT a.access_id, a.access_name, a.created_date, a.updated_date
            FROM user_roles ur
            JOIN roles r ON ur.role_id = r.role_id
            JOIN access_role ar ON r.role_id = ar.role_id
            JOIN access a ON ar.access_id = a.access_id
            WHERE ur.user_id = $1
              AND ($2::timestamptz IS NULL OR ur.expiry_date IS NULL OR ur.expiry_date > $2)
            ORDER BY a.access_id
            "#,
        )
        .bind(user_id)
        .bind(active_at)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(RbacError::NoAccessFound);
        }

        Ok(rows.iter().map(access_from_row).collect())
    }
}
