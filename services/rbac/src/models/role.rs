//! Role model and the user-role association

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Entity;

/// Role entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Role {
    type Key = i32;
    type Draft = NewRole;
    type Changes = NewRole;
    const KIND: &'static str = "role";
}

/// Role creation and update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
}

/// User role association
///
/// `expires_at` is stored with the membership. Whether it limits the
/// membership is decided by the access aggregator's expiry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: i32,
    pub role_id: i32,
    #[serde(rename = "expiry_date")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRole {
    /// Whether the membership still counts at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

impl Entity for UserRole {
    type Key = (i32, i32);
    type Draft = NewUserRole;
    type Changes = UpdateUserRole;
    const KIND: &'static str = "user role";
}

/// New user role payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserRole {
    pub user_id: i32,
    pub role_id: i32,
    #[serde(default, rename = "expiry_date")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// User role update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRole {
    #[serde(default, rename = "expiry_date")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn membership(expires_at: Option<DateTime<Utc>>) -> UserRole {
        let now = Utc::now();
        UserRole {
            user_id: 1,
            role_id: 1,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_membership_without_expiry_is_always_active() {
        assert!(membership(None).is_active_at(Utc::now()));
    }

    #[test]
    fn test_membership_expires_at_its_expiry() {
        let now = Utc::now();
        assert!(membership(Some(now + Duration::hours(1))).is_active_at(now));
        assert!(!membership(Some(now)).is_active_at(now));
        assert!(!membership(Some(now - Duration::seconds(1))).is_active_at(now));
    }

    #[test]
    fn test_new_user_role_reads_expiry_date_field() {
        let payload: NewUserRole =
            serde_json::from_str(r#"{"user_id": 3, "role_id": 7}"#).unwrap();
        assert_eq!(payload.user_id, 3);
        assert_eq!(payload.role_id, 7);
        assert!(payload.expires_at.is_none());

        let payload: NewUserRole = serde_json::from_str(
            r#"{"user_id": 3, "role_id": 7, "expiry_date": "2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(payload.expires_at.is_some());
    }
}
