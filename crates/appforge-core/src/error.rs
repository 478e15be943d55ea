//! Core error types for the appforge framework.
//!
//! [`ForgeError`] covers HTTP-mapped errors, validation failures, signing
//! failures, and configuration problems. Each variant maps to an HTTP status
//! code via [`ForgeError::status_code`].

use http::StatusCode;
use thiserror::Error;

/// Convenience alias for results with a [`ForgeError`].
pub type ForgeResult<T> = Result<T, ForgeError>;

/// The primary error type for the appforge framework.
#[derive(Error, Debug)]
pub enum ForgeError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 400 Bad Request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 401 Unauthorized.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 403 Forbidden / Permission Denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 405 Method Not Allowed.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    // ── Security errors ──────────────────────────────────────────────

    /// A signed token (OAuth state, reset hash binding) failed verification.
    #[error("Signature is not valid: {0}")]
    BadSignature(String),

    /// Password hashing or verification failed.
    #[error("Password hashing error: {0}")]
    Hashing(String),

    // ── Application errors ───────────────────────────────────────────

    /// Form or model validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Settings are missing or inconsistent.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Anything that does not fit the categories above.
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl ForgeError {
    /// Maps the error to the HTTP status code a handler should return.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) | Self::BadSignature(_) => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Hashing(_) | Self::ImproperlyConfigured(_) | Self::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<toml::de::Error> for ForgeError {
    fn from(err: toml::de::Error) -> Self {
        Self::ImproperlyConfigured(err.to_string())
    }
}
