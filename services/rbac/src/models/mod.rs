//! RBAC service models

pub mod access;
pub mod role;
pub mod user;

// Re-export for convenience
pub use access::{Access, NewAccess, NewRoleAccess, RoleAccess};
pub use role::{NewRole, NewUserRole, Role, UpdateUserRole, UserRole};
pub use user::{LoginCredentials, NewUser, PasswordChange, UpdateUser, User};
