//! Application state shared across handlers

use sqlx::PgPool;

use crate::aggregator::{AccessAggregator, ExpiryPolicy};
use crate::authenticator::Authenticator;
use crate::jwt::JwtService;
use crate::memory::{
    MemoryAccesses, MemoryRoleAccesses, MemoryRoles, MemoryStore, MemoryUserRoles, MemoryUsers,
};
use crate::models::{Access, Role};
use crate::repositories::{
    AccessRepository, RoleAccessRepository, RoleRepository, UserRepository, UserRoleRepository,
};
use crate::store::{CrudStore, RoleAccessStore, UserRoleStore, UserStore};

/// A family of stores the router can be built over
pub trait Backend: Send + Sync + 'static {
    type Users: UserStore + Clone + 'static;
    type Roles: CrudStore<Role> + Clone + 'static;
    type Accesses: CrudStore<Access> + Clone + 'static;
    type UserRoles: UserRoleStore + Clone + 'static;
    type RoleAccesses: RoleAccessStore + Clone + 'static;
}

/// Stores backed by Postgres
pub struct Postgres;

impl Backend for Postgres {
    type Users = UserRepository;
    type Roles = RoleRepository;
    type Accesses = AccessRepository;
    type UserRoles = UserRoleRepository;
    type RoleAccesses = RoleAccessRepository;
}

/// Stores backed by [`MemoryStore`]
pub struct InMemory;

impl Backend for InMemory {
    type Users = MemoryUsers;
    type Roles = MemoryRoles;
    type Accesses = MemoryAccesses;
    type UserRoles = MemoryUserRoles;
    type RoleAccesses = MemoryRoleAccesses;
}

/// Application state shared across handlers
pub struct AppState<B: Backend> {
    pub users: B::Users,
    pub roles: B::Roles,
    pub accesses: B::Accesses,
    pub user_roles: B::UserRoles,
    pub role_accesses: B::RoleAccesses,
    pub aggregator: AccessAggregator<B::UserRoles>,
    pub authenticator: Authenticator<B::Users, B::UserRoles>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            roles: self.roles.clone(),
            accesses: self.accesses.clone(),
            user_roles: self.user_roles.clone(),
            role_accesses: self.role_accesses.clone(),
            aggregator: self.aggregator.clone(),
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<B: Backend> AppState<B> {
    /// Wire the aggregator and authenticator over the given stores
    pub fn new(
        users: B::Users,
        roles: B::Roles,
        accesses: B::Accesses,
        user_roles: B::UserRoles,
        role_accesses: B::RoleAccesses,
        jwt_service: JwtService,
        expiry: ExpiryPolicy,
    ) -> Self {
        let aggregator = AccessAggregator::new(user_roles.clone(), expiry);
        let authenticator = Authenticator::new(users.clone(), aggregator.clone(), jwt_service);

        Self {
            users,
            roles,
            accesses,
            user_roles,
            role_accesses,
            aggregator,
            authenticator,
        }
    }
}

impl AppState<Postgres> {
    pub fn from_pool(pool: PgPool, jwt_service: JwtService, expiry: ExpiryPolicy) -> Self {
        Self::new(
            UserRepository::new(pool.clone()),
            RoleRepository::new(pool.clone()),
            AccessRepository::new(pool.clone()),
            UserRoleRepository::new(pool.clone()),
            RoleAccessRepository::new(pool),
            jwt_service,
            expiry,
        )
    }
}

impl AppState<InMemory> {
    pub fn in_memory(store: &MemoryStore, jwt_service: JwtService, expiry: ExpiryPolicy) -> Self {
        Self::new(
            store.users(),
            store.roles(),
            store.accesses(),
            store.user_roles(),
            store.role_accesses(),
            jwt_service,
            expiry,
        )
    }
}
