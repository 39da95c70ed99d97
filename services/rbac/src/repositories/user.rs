//! User repository for database operations

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use crate::error::{RbacError, RbacResult};
use crate::models::{NewUser, UpdateUser, User};
use crate::store::{CrudStore, Entity, UserStore};

const USER_COLUMNS: &str =
    "user_id, user_name, email_id, mobile, password, created_date, updated_date";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("user_id"),
        username: row.get("user_name"),
        email: row.get("email_id"),
        mobile: row.get("mobile"),
        password_hash: row.get("password"),
        created_at: row.get("created_date"),
        updated_at: row.get("updated_date"),
    }
}

impl CrudStore<User> for UserRepository {
    async fn create(&self, new_user: &NewUser) -> RbacResult<User> {
        info!("Creating new user: {}", new_user.username);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (user_name, email_id, mobile, password)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.mobile)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(User::KIND, e))?;

        Ok(user_from_row(&row))
    }

    async fn get(&self, id: i32) -> RbacResult<User> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(user_from_row)
            .ok_or(RbacError::NotFound(User::KIND))
    }

    async fn update(&self, id: i32, changes: &UpdateUser) -> RbacResult<User> {
        info!("Updating user {}", id);

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET user_name = $1, email_id = $2, mobile = $3, updated_date = NOW()
            WHERE user_id = $4
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.mobile)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RbacError::from_write(User::KIND, e))?;

        row.as_ref()
            .map(user_from_row)
            .ok_or(RbacError::NotFound(User::KIND))
    }

    async fn delete(&self, id: i32) -> RbacResult<()> {
        info!("Deleting user {}", id);

        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::NotFound(User::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY user_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }
}

impl UserStore for UserRepository {
    async fn find_by_username(&self, username: &str) -> RbacResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_name = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn password_hash(&self, user_id: i32) -> RbacResult<String> {
        let hash: Option<String> = sqlx::query_scalar("SELECT password FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        hash.ok_or(RbacError::NotFound(User::KIND))
    }

    async fn set_password_hash(&self, user_id: i32, password_hash: &str) -> RbacResult<()> {
        info!("Updating password for user {}", user_id);

        let result = sqlx::query(
            "UPDATE users SET password = $1, updated_date = NOW() WHERE user_id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RbacError::NotFound(User::KIND));
        }
        Ok(())
    }
}
