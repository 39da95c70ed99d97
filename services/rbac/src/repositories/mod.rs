//! Postgres repositories for database operations

pub mod access;
pub mod role;
pub mod role_access;
pub mod user;
pub mod user_role;

pub use access::AccessRepository;
pub use role::RoleRepository;
pub use role_access::RoleAccessRepository;
pub use user::UserRepository;
pub use user_role::UserRoleRepository;

use sqlx::{Row, postgres::PgRow};

use crate::models::{Access, Role};

pub(crate) fn role_from_row(row: &PgRow) -> Role {
    Role {
        id: row.get("role_id"),
        name: row.get("role_name"),
        created_at: row.get("created_date"),
        updated_at: row.get("updated_date"),
    }
}

pub(crate) fn access_from_row(row: &PgRow) -> Access {
    Access {
        id: row.get("access_id"),
        name: row.get("access_name"),
        created_at: row.get("created_date"),
        updated_at: row.get("updated_date"),
    }
}
