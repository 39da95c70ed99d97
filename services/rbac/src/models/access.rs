//! Access (permission) model and the role-access association

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// Access entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Access {
    type Key = i32;
    type Draft = NewAccess;
    type Changes = NewAccess;
    const KIND: &'static str = "access";
}

/// Access creation and update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccess {
    pub name: String,
}

/// Role access association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAccess {
    pub role_id: i32,
    pub access_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for RoleAccess {
    type Key = (i32, i32);
    type Draft = NewRoleAccess;
    // An update moves the grant to another (role, access) pair
    type Changes = NewRoleAccess;
    const KIND: &'static str = "role access";
}

/// Role access creation payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoleAccess {
    pub role_id: i32,
    pub access_id: i32,
}
