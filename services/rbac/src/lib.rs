//! Role-based access control service
//!
//! Users hold roles, roles grant accesses, and a user's effective accesses
//! are the union over their roles. Logging in issues a signed token listing
//! those accesses.

pub mod aggregator;
pub mod authenticator;
pub mod config;
pub mod database;
pub mod error;
pub mod jwt;
pub mod memory;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
