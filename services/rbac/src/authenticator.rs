//! Login and password change
//!
//! Login is two linear steps with no retries: check the credentials, then
//! issue a token embedding the user's effective accesses.

use tracing::{info, warn};

use crate::aggregator::AccessAggregator;
use crate::error::{RbacError, RbacResult};
use crate::jwt::JwtService;
use crate::password::{hash_password, verify_password};
use crate::store::{UserRoleStore, UserStore};
use crate::validation::validate_password;

/// Credential checks and session token issuance
#[derive(Clone)]
pub struct Authenticator<U, R> {
    users: U,
    aggregator: AccessAggregator<R>,
    jwt_service: JwtService,
}

impl<U: UserStore, R: UserRoleStore> Authenticator<U, R> {
    pub fn new(users: U, aggregator: AccessAggregator<R>, jwt_service: JwtService) -> Self {
        Self {
            users,
            aggregator,
            jwt_service,
        }
    }

    /// Verify `username`/`password` and return a signed session token
    ///
    /// An unknown username and a wrong password both fail with
    /// `InvalidCredentials`. A user whose roles grant nothing still gets a
    /// token, with an empty access list.
    pub async fn login(&self, username: &str, password: &str) -> RbacResult<String> {
        info!("Login attempt for user: {}", username);

        let Some(user) = self.users.find_by_username(username).await? else {
            warn!("Login rejected: unknown user");
            return Err(RbacError::InvalidCredentials);
        };

        let stored_hash = self.users.password_hash(user.id).await?;
        if !verify_password(password, &stored_hash)? {
            warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(RbacError::InvalidCredentials);
        }

        let accesses = match self.aggregator.effective_accesses(user.id).await {
            Ok(accesses) => accesses,
            Err(RbacError::NoAccessFound) => Vec::new(),
            Err(e) => return Err(e),
        };

        let token = self.jwt_service.generate_token(&user, &accesses)?;
        info!(
            user_id = user.id,
            accesses = accesses.len(),
            "Issued session token"
        );
        Ok(token)
    }

    /// Replace a user's password after checking the current one
    ///
    /// A wrong `old_password` fails with `InvalidCredentials` and leaves the
    /// stored hash untouched. A weak new password is a validation error.
    pub async fn change_password(
        &self,
        user_id: i32,
        old_password: &str,
        new_password: &str,
    ) -> RbacResult<()> {
        let stored_hash = self.users.password_hash(user_id).await?;
        if !verify_password(old_password, &stored_hash)? {
            warn!(user_id, "Password change rejected: incorrect old password");
            return Err(RbacError::InvalidCredentials);
        }

        validate_password(new_password)?;
        let new_hash = hash_password(new_password)?;
        self.users.set_password_hash(user_id, &new_hash).await?;
        info!(user_id, "Password changed");
        Ok(())
    }
}
