//! JWT service for session token issuance and validation
//!
//! Tokens are signed with HS256 using the process-wide secret. The secret is
//! handed to [`JwtService::new`] at startup and never read from globals.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{Access, User};

/// Default session lifetime: 24 hours
pub const DEFAULT_TOKEN_EXPIRY_HOURS: u64 = 24;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared secret used to sign and verify tokens
    pub secret: String,
    /// Token lifetime in hours
    pub token_expiry_hours: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("token_expiry_hours", &self.token_expiry_hours)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Secret key for signing tokens (required, non-empty)
    /// - `JWT_TOKEN_EXPIRY_HOURS`: Token lifetime in hours (default: 24)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let token_expiry_hours = std::env::var("JWT_TOKEN_EXPIRY_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_EXPIRY_HOURS);

        Ok(JwtConfig {
            secret,
            token_expiry_hours,
        })
    }
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub user_id: i32,
    /// Username
    pub username: String,
    /// Names of the user's effective accesses
    pub access: Vec<String>,
    /// Expiration time (Unix seconds)
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Build the claims for `user` holding `accesses`, expiring one token
    /// lifetime from now
    pub fn claims_for(&self, user: &User, accesses: &[Access]) -> Result<Claims> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        Ok(Claims {
            user_id: user.id,
            username: user.username.clone(),
            access: accesses.iter().map(|a| a.name.clone()).collect(),
            exp: now + self.token_lifetime_secs(),
        })
    }

    /// Sign a session token for a user and their effective accesses
    pub fn generate_token(&self, user: &User, accesses: &[Access]) -> Result<String> {
        let claims = self.claims_for(user, accesses)?;
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Token lifetime in seconds
    pub fn token_lifetime_secs(&self) -> u64 {
        self.config.token_expiry_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serial_test::serial;

    fn service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            token_expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
        })
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            mobile: "9876543210".to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn access(id: i32, name: &str) -> Access {
        let now = Utc::now();
        Access {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_carries_identity_accesses_and_expiry() {
        let jwt = service("test-secret");
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let token = jwt
            .generate_token(&user(), &[access(1, "read"), access(2, "write")])
            .unwrap();
        let claims = jwt.validate_token(&token).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.access, vec!["read", "write"]);
        let day = 24 * 3600;
        assert!(claims.exp >= before + day);
        assert!(claims.exp <= before + day + 5);
    }

    #[test]
    fn test_claims_serialize_with_stable_names() {
        let jwt = service("test-secret");
        let claims = jwt.claims_for(&user(), &[]).unwrap();
        let value = serde_json::to_value(&claims).unwrap();

        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["access", "exp", "user_id", "username"]);
        assert!(value["access"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_token_signed_with_another_secret_is_rejected() {
        let token = service("test-secret").generate_token(&user(), &[]).unwrap();
        assert!(service("other-secret").validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = service("test-secret");
        let claims = Claims {
            user_id: 7,
            username: "alice".to_string(),
            access: vec![],
            exp: 1_000,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(jwt.validate_token(&token).is_err());
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::set_var("JWT_SECRET", "env-secret");
            std::env::remove_var("JWT_TOKEN_EXPIRY_HOURS");
        }

        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.secret, "env-secret");
        assert_eq!(config.token_expiry_hours, 24);

        unsafe {
            std::env::set_var("JWT_TOKEN_EXPIRY_HOURS", "2");
        }
        assert_eq!(JwtConfig::from_env().unwrap().token_expiry_hours, 2);

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_TOKEN_EXPIRY_HOURS");
        }
        assert!(JwtConfig::from_env().is_err());
    }
}
