//! In-memory backend
//!
//! Mirrors the Postgres schema closely enough to stand in for it in tests
//! and local runs: auto-increment ids, unique names, foreign key checks on
//! associations, cascading deletes and insertion-ordered listings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{RbacError, RbacResult};
use crate::models::{
    Access, NewAccess, NewRole, NewRoleAccess, NewUser, NewUserRole, Role, RoleAccess,
    UpdateUser, UpdateUserRole, User, UserRole,
};
use crate::store::{CrudStore, Entity, RoleAccessStore, UserRoleStore, UserStore};

#[derive(Default)]
struct Tables {
    last_user_id: i32,
    users: Vec<User>,
    last_role_id: i32,
    roles: Vec<Role>,
    last_access_id: i32,
    accesses: Vec<Access>,
    user_roles: Vec<UserRole>,
    role_accesses: Vec<RoleAccess>,
}

impl Tables {
    fn has_user(&self, id: i32) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn has_role(&self, id: i32) -> bool {
        self.roles.iter().any(|r| r.id == id)
    }

    fn has_access(&self, id: i32) -> bool {
        self.accesses.iter().any(|a| a.id == id)
    }
}

/// Shared in-memory tables; hand out per-entity stores with the accessors
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> MemoryUsers {
        MemoryUsers(self.clone())
    }

    pub fn roles(&self) -> MemoryRoles {
        MemoryRoles(self.clone())
    }

    pub fn accesses(&self) -> MemoryAccesses {
        MemoryAccesses(self.clone())
    }

    pub fn user_roles(&self) -> MemoryUserRoles {
        MemoryUserRoles(self.clone())
    }

    pub fn role_accesses(&self) -> MemoryRoleAccesses {
        MemoryRoleAccesses(self.clone())
    }
}

#[derive(Clone)]
pub struct MemoryUsers(MemoryStore);

#[derive(Clone)]
pub struct MemoryRoles(MemoryStore);

#[derive(Clone)]
pub struct MemoryAccesses(MemoryStore);

#[derive(Clone)]
pub struct MemoryUserRoles(MemoryStore);

#[derive(Clone)]
pub struct MemoryRoleAccesses(MemoryStore);

impl CrudStore<User> for MemoryUsers {
    async fn create(&self, new_user: &NewUser) -> RbacResult<User> {
        let mut tables = self.0.tables.lock().await;
        if tables.users.iter().any(|u| u.username == new_user.username) {
            return Err(RbacError::DuplicateKey(User::KIND));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.last_user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            mobile: new_user.mobile.clone(),
            password_hash: new_user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        info!("Created user {} ({})", user.id, user.username);
        Ok(user)
    }

    async fn get(&self, id: i32) -> RbacResult<User> {
        let tables = self.0.tables.lock().await;
        tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(RbacError::NotFound(User::KIND))
    }

    async fn update(&self, id: i32, changes: &UpdateUser) -> RbacResult<User> {
        let mut tables = self.0.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|u| u.id != id && u.username == changes.username)
        {
            return Err(RbacError::DuplicateKey(User::KIND));
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RbacError::NotFound(User::KIND))?;
        user.username = changes.username.clone();
        user.email = changes.email.clone();
        user.mobile = changes.mobile.clone();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: i32) -> RbacResult<()> {
        let mut tables = self.0.tables.lock().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(RbacError::NotFound(User::KIND));
        }
        tables.user_roles.retain(|ur| ur.user_id != id);
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<User>> {
        Ok(self.0.tables.lock().await.users.clone())
    }
}

impl UserStore for MemoryUsers {
    async fn find_by_username(&self, username: &str) -> RbacResult<Option<User>> {
        let tables = self.0.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn password_hash(&self, user_id: i32) -> RbacResult<String> {
        let tables = self.0.tables.lock().await;
        tables
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.password_hash.clone())
            .ok_or(RbacError::NotFound(User::KIND))
    }

    async fn set_password_hash(&self, user_id: i32, password_hash: &str) -> RbacResult<()> {
        let mut tables = self.0.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(RbacError::NotFound(User::KIND))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }
}

impl CrudStore<Role> for MemoryRoles {
    async fn create(&self, new_role: &NewRole) -> RbacResult<Role> {
        let mut tables = self.0.tables.lock().await;
        if tables.roles.iter().any(|r| r.name == new_role.name) {
            return Err(RbacError::DuplicateKey(Role::KIND));
        }

        tables.last_role_id += 1;
        let now = Utc::now();
        let role = Role {
            id: tables.last_role_id,
            name: new_role.name.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.roles.push(role.clone());
        Ok(role)
    }

    async fn get(&self, id: i32) -> RbacResult<Role> {
        let tables = self.0.tables.lock().await;
        tables
            .roles
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(RbacError::NotFound(Role::KIND))
    }

    async fn update(&self, id: i32, changes: &NewRole) -> RbacResult<Role> {
        let mut tables = self.0.tables.lock().await;
        if tables
            .roles
            .iter()
            .any(|r| r.id != id && r.name == changes.name)
        {
            return Err(RbacError::DuplicateKey(Role::KIND));
        }

        let role = tables
            .roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RbacError::NotFound(Role::KIND))?;
        role.name = changes.name.clone();
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete(&self, id: i32) -> RbacResult<()> {
        let mut tables = self.0.tables.lock().await;
        let before = tables.roles.len();
        tables.roles.retain(|r| r.id != id);
        if tables.roles.len() == before {
            return Err(RbacError::NotFound(Role::KIND));
        }
        tables.user_roles.retain(|ur| ur.role_id != id);
        tables.role_accesses.retain(|ra| ra.role_id != id);
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<Role>> {
        Ok(self.0.tables.lock().await.roles.clone())
    }
}

impl CrudStore<Access> for MemoryAccesses {
    async fn create(&self, new_access: &NewAccess) -> RbacResult<Access> {
        let mut tables = self.0.tables.lock().await;
        if tables.accesses.iter().any(|a| a.name == new_access.name) {
            return Err(RbacError::DuplicateKey(Access::KIND));
        }

        tables.last_access_id += 1;
        let now = Utc::now();
        let access = Access {
            id: tables.last_access_id,
            name: new_access.name.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.accesses.push(access.clone());
        Ok(access)
    }

    async fn get(&self, id: i32) -> RbacResult<Access> {
        let tables = self.0.tables.lock().await;
        tables
            .accesses
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(RbacError::NotFound(Access::KIND))
    }

    async fn update(&self, id: i32, changes: &NewAccess) -> RbacResult<Access> {
        let mut tables = self.0.tables.lock().await;
        if tables
            .accesses
            .iter()
            .any(|a| a.id != id && a.name == changes.name)
        {
            return Err(RbacError::DuplicateKey(Access::KIND));
        }

        let access = tables
            .accesses
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RbacError::NotFound(Access::KIND))?;
        access.name = changes.name.clone();
        access.updated_at = Utc::now();
        Ok(access.clone())
    }

    async fn delete(&self, id: i32) -> RbacResult<()> {
        let mut tables = self.0.tables.lock().await;
        let before = tables.accesses.len();
        tables.accesses.retain(|a| a.id != id);
        if tables.accesses.len() == before {
            return Err(RbacError::NotFound(Access::KIND));
        }
        tables.role_accesses.retain(|ra| ra.access_id != id);
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<Access>> {
        Ok(self.0.tables.lock().await.accesses.clone())
    }
}

impl CrudStore<UserRole> for MemoryUserRoles {
    async fn create(&self, new: &NewUserRole) -> RbacResult<UserRole> {
        let mut tables = self.0.tables.lock().await;
        if !tables.has_user(new.user_id) || !tables.has_role(new.role_id) {
            return Err(RbacError::InvalidReference(UserRole::KIND));
        }
        if tables
            .user_roles
            .iter()
            .any(|ur| ur.user_id == new.user_id && ur.role_id == new.role_id)
        {
            return Err(RbacError::DuplicateKey(UserRole::KIND));
        }

        let now = Utc::now();
        let user_role = UserRole {
            user_id: new.user_id,
            role_id: new.role_id,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        };
        tables.user_roles.push(user_role.clone());
        Ok(user_role)
    }

    async fn get(&self, (user_id, role_id): (i32, i32)) -> RbacResult<UserRole> {
        let tables = self.0.tables.lock().await;
        tables
            .user_roles
            .iter()
            .find(|ur| ur.user_id == user_id && ur.role_id == role_id)
            .cloned()
            .ok_or(RbacError::NotFound(UserRole::KIND))
    }

    async fn update(
        &self,
        (user_id, role_id): (i32, i32),
        changes: &UpdateUserRole,
    ) -> RbacResult<UserRole> {
        let mut tables = self.0.tables.lock().await;
        let user_role = tables
            .user_roles
            .iter_mut()
            .find(|ur| ur.user_id == user_id && ur.role_id == role_id)
            .ok_or(RbacError::NotFound(UserRole::KIND))?;
        user_role.expires_at = changes.expires_at;
        user_role.updated_at = Utc::now();
        Ok(user_role.clone())
    }

    async fn delete(&self, (user_id, role_id): (i32, i32)) -> RbacResult<()> {
        let mut tables = self.0.tables.lock().await;
        let before = tables.user_roles.len();
        tables
            .user_roles
            .retain(|ur| !(ur.user_id == user_id && ur.role_id == role_id));
        if tables.user_roles.len() == before {
            return Err(RbacError::NotFound(UserRole::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<UserRole>> {
        Ok(self.0.tables.lock().await.user_roles.clone())
    }
}

impl UserRoleStore for MemoryUserRoles {
    async fn roles_for_user(&self, user_id: i32) -> RbacResult<Vec<Role>> {
        let tables = self.0.tables.lock().await;
        let role_ids: BTreeSet<i32> = tables
            .user_roles
            .iter()
            .filter(|ur| ur.user_id == user_id)
            .map(|ur| ur.role_id)
            .collect();

        let mut roles: Vec<Role> = tables
            .roles
            .iter()
            .filter(|r| role_ids.contains(&r.id))
            .cloned()
            .collect();
        roles.sort_by_key(|r| r.id);
        Ok(roles)
    }

    async fn all_access(
        &self,
        user_id: i32,
        active_at: Option<DateTime<Utc>>,
    ) -> RbacResult<Vec<Access>> {
        let tables = self.0.tables.lock().await;
        let role_ids: BTreeSet<i32> = tables
            .user_roles
            .iter()
            .filter(|ur| ur.user_id == user_id)
            .filter(|ur| active_at.is_none_or(|now| ur.is_active_at(now)))
            .map(|ur| ur.role_id)
            .collect();

        let access_ids: BTreeSet<i32> = tables
            .role_accesses
            .iter()
            .filter(|ra| role_ids.contains(&ra.role_id))
            .map(|ra| ra.access_id)
            .collect();

        let distinct: BTreeMap<i32, Access> = tables
            .accesses
            .iter()
            .filter(|a| access_ids.contains(&a.id))
            .map(|a| (a.id, a.clone()))
            .collect();

        if distinct.is_empty() {
            return Err(RbacError::NoAccessFound);
        }
        Ok(distinct.into_values().collect())
    }
}

impl CrudStore<RoleAccess> for MemoryRoleAccesses {
    async fn create(&self, new: &NewRoleAccess) -> RbacResult<RoleAccess> {
        let mut tables = self.0.tables.lock().await;
        if !tables.has_role(new.role_id) || !tables.has_access(new.access_id) {
            return Err(RbacError::InvalidReference(RoleAccess::KIND));
        }
        if tables
            .role_accesses
            .iter()
            .any(|ra| ra.role_id == new.role_id && ra.access_id == new.access_id)
        {
            return Err(RbacError::DuplicateKey(RoleAccess::KIND));
        }

        let now = Utc::now();
        let role_access = RoleAccess {
            role_id: new.role_id,
            access_id: new.access_id,
            created_at: now,
            updated_at: now,
        };
        tables.role_accesses.push(role_access.clone());
        Ok(role_access)
    }

    async fn get(&self, (role_id, access_id): (i32, i32)) -> RbacResult<RoleAccess> {
        let tables = self.0.tables.lock().await;
        tables
            .role_accesses
            .iter()
            .find(|ra| ra.role_id == role_id && ra.access_id == access_id)
            .cloned()
            .ok_or(RbacError::NotFound(RoleAccess::KIND))
    }

    async fn update(
        &self,
        (role_id, access_id): (i32, i32),
        changes: &NewRoleAccess,
    ) -> RbacResult<RoleAccess> {
        let mut tables = self.0.tables.lock().await;
        let position = tables
            .role_accesses
            .iter()
            .position(|ra| ra.role_id == role_id && ra.access_id == access_id)
            .ok_or(RbacError::NotFound(RoleAccess::KIND))?;

        let moved = (changes.role_id, changes.access_id) != (role_id, access_id);
        if moved
            && tables
                .role_accesses
                .iter()
                .any(|ra| ra.role_id == changes.role_id && ra.access_id == changes.access_id)
        {
            return Err(RbacError::DuplicateKey(RoleAccess::KIND));
        }
        if !tables.has_role(changes.role_id) || !tables.has_access(changes.access_id) {
            return Err(RbacError::InvalidReference(RoleAccess::KIND));
        }

        let role_access = &mut tables.role_accesses[position];
        role_access.role_id = changes.role_id;
        role_access.access_id = changes.access_id;
        role_access.updated_at = Utc::now();
        Ok(role_access.clone())
    }

    async fn delete(&self, (role_id, access_id): (i32, i32)) -> RbacResult<()> {
        let mut tables = self.0.tables.lock().await;
        let before = tables.role_accesses.len();
        tables
            .role_accesses
            .retain(|ra| !(ra.role_id == role_id && ra.access_id == access_id));
        if tables.role_accesses.len() == before {
            return Err(RbacError::NotFound(RoleAccess::KIND));
        }
        Ok(())
    }

    async fn get_all(&self) -> RbacResult<Vec<RoleAccess>> {
        Ok(self.0.tables.lock().await.role_accesses.clone())
    }
}

impl RoleAccessStore for MemoryRoleAccesses {
    async fn accesses_for_role(&self, role_id: i32) -> RbacResult<Vec<Access>> {
        let tables = self.0.tables.lock().await;
        let access_ids: BTreeSet<i32> = tables
            .role_accesses
            .iter()
            .filter(|ra| ra.role_id == role_id)
            .map(|ra| ra.access_id)
            .collect();

        Ok(tables
            .accesses
            .iter()
            .filter(|a| access_ids.contains(&a.id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            mobile: "9876543210".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn named(name: &str) -> NewRole {
        NewRole {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let store = MemoryStore::new();
        let users = store.users();

        let created = users.create(&new_user("alice")).await.unwrap();
        let fetched = users.get(created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.mobile, "9876543210");
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_insertion_order() {
        let store = MemoryStore::new();
        let roles = store.roles();

        let admin = roles.create(&named("admin")).await.unwrap();
        let viewer = roles.create(&named("viewer")).await.unwrap();
        assert!(admin.id < viewer.id);

        let names: Vec<String> = roles
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["admin", "viewer"]);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected() {
        let store = MemoryStore::new();
        let roles = store.roles();
        let admin = roles.create(&named("admin")).await.unwrap();
        let viewer = roles.create(&named("viewer")).await.unwrap();

        assert!(matches!(
            roles.create(&named("admin")).await,
            Err(RbacError::DuplicateKey("role"))
        ));
        assert!(matches!(
            roles.update(viewer.id, &named("admin")).await,
            Err(RbacError::DuplicateKey("role"))
        ));
        // Renaming to its own name is not a collision
        assert!(roles.update(admin.id, &named("admin")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mutations_on_missing_rows_are_not_found() {
        let store = MemoryStore::new();
        let accesses = store.accesses();

        assert!(matches!(
            accesses.get(42).await,
            Err(RbacError::NotFound("access"))
        ));
        assert!(matches!(
            accesses.update(42, &NewAccess { name: "read".into() }).await,
            Err(RbacError::NotFound("access"))
        ));
        assert!(matches!(
            accesses.delete(42).await,
            Err(RbacError::NotFound("access"))
        ));
    }

    #[tokio::test]
    async fn test_associations_require_existing_rows() {
        let store = MemoryStore::new();
        let role = store.roles().create(&named("admin")).await.unwrap();

        let result = store
            .user_roles()
            .create(&NewUserRole {
                user_id: 99,
                role_id: role.id,
                expires_at: None,
            })
            .await;
        assert!(matches!(result, Err(RbacError::InvalidReference(_))));

        let result = store
            .role_accesses()
            .create(&NewRoleAccess {
                role_id: role.id,
                access_id: 99,
            })
            .await;
        assert!(matches!(result, Err(RbacError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_deleting_an_access_removes_its_grants() {
        let store = MemoryStore::new();
        let role = store.roles().create(&named("admin")).await.unwrap();
        let read = store
            .accesses()
            .create(&NewAccess { name: "read".into() })
            .await
            .unwrap();
        store
            .role_accesses()
            .create(&NewRoleAccess {
                role_id: role.id,
                access_id: read.id,
            })
            .await
            .unwrap();

        store.accesses().delete(read.id).await.unwrap();

        assert!(store.role_accesses().get_all().await.unwrap().is_empty());
        assert!(
            store
                .role_accesses()
                .accesses_for_role(role.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_moving_a_grant_onto_an_existing_pair_is_a_duplicate() {
        let store = MemoryStore::new();
        let role = store.roles().create(&named("admin")).await.unwrap();
        let read = store
            .accesses()
            .create(&NewAccess { name: "read".into() })
            .await
            .unwrap();
        let write = store
            .accesses()
            .create(&NewAccess {
                name: "write".into(),
            })
            .await
            .unwrap();
        let grants = store.role_accesses();
        for access_id in [read.id, write.id] {
            grants
                .create(&NewRoleAccess {
                    role_id: role.id,
                    access_id,
                })
                .await
                .unwrap();
        }

        let result = grants
            .update(
                (role.id, read.id),
                &NewRoleAccess {
                    role_id: role.id,
                    access_id: write.id,
                },
            )
            .await;
        assert!(matches!(result, Err(RbacError::DuplicateKey(_))));
    }
}
