//! Effective access computation
//!
//! A user's effective accesses are the union of the accesses granted to each
//! of their roles, deduplicated by access id. The set is derived on demand
//! and never stored.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RbacError, RbacResult};
use crate::models::Access;
use crate::store::UserRoleStore;

/// How a membership's `expiry_date` affects access computation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Expiry is stored but every membership counts
    #[default]
    Ignore,
    /// Memberships whose expiry has passed are left out at read time
    ExpireOnRead,
}

/// Computes effective access sets from the user-role and role-access graph
#[derive(Clone)]
pub struct AccessAggregator<R> {
    user_roles: R,
    expiry: ExpiryPolicy,
}

impl<R: UserRoleStore> AccessAggregator<R> {
    pub fn new(user_roles: R, expiry: ExpiryPolicy) -> Self {
        Self { user_roles, expiry }
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Distinct accesses reachable by `user_id`, ordered by access id
    ///
    /// Fails with `NoAccessFound` when the user holds no role or their roles
    /// grant nothing.
    pub async fn effective_accesses(&self, user_id: i32) -> RbacResult<Vec<Access>> {
        let active_at = match self.expiry {
            ExpiryPolicy::Ignore => None,
            ExpiryPolicy::ExpireOnRead => Some(Utc::now()),
        };

        let reachable = self.user_roles.all_access(user_id, active_at).await?;

        let distinct: BTreeMap<i32, Access> =
            reachable.into_iter().map(|a| (a.id, a)).collect();
        if distinct.is_empty() {
            return Err(RbacError::NoAccessFound);
        }

        debug!(user_id, count = distinct.len(), "computed effective accesses");
        Ok(distinct.into_values().collect())
    }

    /// Names of the effective accesses, in access id order
    pub async fn effective_access_names(&self, user_id: i32) -> RbacResult<Vec<String>> {
        Ok(self
            .effective_accesses(user_id)
            .await?
            .into_iter()
            .map(|a| a.name)
            .collect())
    }
}
