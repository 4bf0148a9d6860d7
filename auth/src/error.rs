//! Error types for authentication operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Everything that can go wrong while authenticating a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token is malformed or its signature does not verify.
    #[error("Invalid access token")]
    InvalidToken,

    /// Token signature is fine but it is past its expiry.
    #[error("Access token has expired")]
    TokenExpired,

    /// Token was revoked by logging out.
    #[error("Access token has been revoked")]
    TokenRevoked,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// A stored password hash could not be parsed.
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// Internal failure (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the client is at fault.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rentcar_auth::AuthError;
    /// assert!(AuthError::TokenExpired.is_user_error());
    /// assert!(!AuthError::Internal("boom".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::InvalidToken | Self::TokenExpired | Self::TokenRevoked
        )
    }
}
