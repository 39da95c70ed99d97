//! Error type shared by the stores, the access aggregator, the authenticator
//! and the HTTP handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;

/// Custom error type for the RBAC service
#[derive(Error, Debug)]
pub enum RbacError {
    /// The entity does not exist, or a mutation affected zero rows
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique constraint (name or composite key) was violated
    #[error("{0} already exists")]
    DuplicateKey(&'static str),

    /// An association references a user, role or access that does not exist
    #[error("{0} references a missing entity")]
    InvalidReference(&'static str),

    /// Unknown username or wrong password; the two cases are not distinguished
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The user's role memberships grant no access at all
    #[error("no access found for the user")]
    NoAccessFound,

    /// A required field is missing or malformed
    #[error("validation error: {0}")]
    Validation(String),

    /// The `id` query parameter is missing or not an integer
    #[error("invalid id in query")]
    InvalidId,

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Hashing, signing or other infrastructure failure
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RbacError {
    fn from(err: sqlx::Error) -> Self {
        RbacError::Database(DatabaseError::Query(err))
    }
}

/// Validation helpers report plain messages
impl From<String> for RbacError {
    fn from(message: String) -> Self {
        RbacError::Validation(message)
    }
}

impl RbacError {
    /// Translate a write failure into the domain taxonomy
    ///
    /// Unique violations become `DuplicateKey` and foreign key violations
    /// become `InvalidReference`; everything else stays a storage error.
    pub fn from_write(kind: &'static str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return RbacError::DuplicateKey(kind);
            }
            if db_err.is_foreign_key_violation() {
                return RbacError::InvalidReference(kind);
            }
        }
        RbacError::from(err)
    }

    /// HTTP status the error maps to at the transport boundary
    pub fn status(&self) -> StatusCode {
        match self {
            RbacError::NotFound(_) | RbacError::NoAccessFound => StatusCode::NOT_FOUND,
            RbacError::DuplicateKey(_) => StatusCode::CONFLICT,
            RbacError::InvalidReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RbacError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            RbacError::Validation(_) | RbacError::InvalidId => StatusCode::BAD_REQUEST,
            RbacError::Database(_) | RbacError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RbacError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            RbacError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Database error".to_string()
            }
            RbacError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for RBAC results
pub type RbacResult<T> = Result<T, RbacError>;
