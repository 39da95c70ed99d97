//! Storage ports for the RBAC service
//!
//! Every entity and association store shares the same CRUD shape, captured
//! by [`CrudStore`] and parameterised by the record type. The association
//! stores add their joined views on top. Postgres implementations live in
//! [`crate::repositories`], the in-memory ones in [`crate::memory`].
//!
//! Methods return `impl Future + Send` so that handlers generic over a
//! backend still produce `Send` futures; implementors write `async fn`.

use std::fmt::Debug;
use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::RbacResult;
use crate::models::{Access, Role, RoleAccess, User, UserRole};

/// A persisted record type
pub trait Entity: Clone + Send + Sync + 'static {
    /// Primary key (single id or composite pair)
    type Key: Copy + Debug + Send + Sync;
    /// Payload accepted by `create`
    type Draft: Send + Sync;
    /// Payload accepted by `update`
    type Changes: Send + Sync;
    /// Name used in error messages
    const KIND: &'static str;
}

/// Create, read, update, delete and list for one record type
pub trait CrudStore<R: Entity>: Send + Sync {
    /// Insert a record and return it with its server-assigned fields
    fn create(&self, draft: &R::Draft) -> impl Future<Output = RbacResult<R>> + Send;

    /// Fetch a record, failing with `NotFound` when absent
    fn get(&self, key: R::Key) -> impl Future<Output = RbacResult<R>> + Send;

    /// Apply `changes`, failing with `NotFound` when no row matched
    fn update(
        &self,
        key: R::Key,
        changes: &R::Changes,
    ) -> impl Future<Output = RbacResult<R>> + Send;

    /// Remove a record, failing with `NotFound` when no row matched
    fn delete(&self, key: R::Key) -> impl Future<Output = RbacResult<()>> + Send;

    /// All records in insertion order
    fn get_all(&self) -> impl Future<Output = RbacResult<Vec<R>>> + Send;
}

/// User store with credential lookups
pub trait UserStore: CrudStore<User> {
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = RbacResult<Option<User>>> + Send;

    /// Stored password hash of a user
    fn password_hash(&self, user_id: i32) -> impl Future<Output = RbacResult<String>> + Send;

    fn set_password_hash(
        &self,
        user_id: i32,
        password_hash: &str,
    ) -> impl Future<Output = RbacResult<()>> + Send;
}

/// User-role association store
pub trait UserRoleStore: CrudStore<UserRole> {
    /// Roles the user is a member of, ordered by role id
    fn roles_for_user(&self, user_id: i32) -> impl Future<Output = RbacResult<Vec<Role>>> + Send;

    /// Distinct accesses reachable through the user's role memberships,
    /// ordered by access id
    ///
    /// With `active_at` set, memberships that expired at or before that
    /// instant are skipped. Fails with `NoAccessFound` when nothing is
    /// reachable.
    fn all_access(
        &self,
        user_id: i32,
        active_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = RbacResult<Vec<Access>>> + Send;
}

/// Role-access association store
pub trait RoleAccessStore: CrudStore<RoleAccess> {
    /// Accesses granted to the role, ordered by access id
    fn accesses_for_role(
        &self,
        role_id: i32,
    ) -> impl Future<Output = RbacResult<Vec<Access>>> + Send;
}
