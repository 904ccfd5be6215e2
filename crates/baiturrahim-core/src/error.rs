//! Error types for `baiturrahim-core`.
//!
//! Every fallible operation in the core returns [`AuthResult<T>`]. The
//! variants are the rejection reasons a caller can observe; the web layer
//! decides how much of that detail reaches the client.

/// Unified error type for admission and authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email, inactive account or wrong password. Deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The token is not a well-formed JWT or its claims do not parse.
    #[error("malformed token")]
    TokenMalformed,

    /// The token signature does not match the server secret.
    #[error("token signature mismatch")]
    TokenBadSignature,

    /// The token is past its expiry instant.
    #[error("token expired")]
    TokenExpired,

    /// An access token was presented where a refresh token was expected,
    /// or the other way round.
    #[error("wrong token type: expected {expected}, got {actual}")]
    TokenWrongType {
        expected: crate::token::TokenKind,
        actual: crate::token::TokenKind,
    },

    /// The token subject no longer exists or has been deactivated.
    #[error("user not found or inactive")]
    UserInactiveOrMissing,

    /// No account has the requested id.
    #[error("user not found")]
    UserNotFound,

    /// The principal's role is not in the allowed set.
    #[error("insufficient role")]
    InsufficientRole,

    /// A user with the same email or username already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The user store failed.
    #[error("user store error: {0}")]
    Store(String),

    /// Hashing failed or a stored hash could not be parsed.
    #[error("password hash error: {0}")]
    Hash(String),

    /// Token signing failed.
    #[error("token signing error: {0}")]
    Signing(String),
}

impl AuthError {
    /// Returns `true` for the token rejection family.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::TokenMalformed
                | AuthError::TokenBadSignature
                | AuthError::TokenExpired
                | AuthError::TokenWrongType { .. }
        )
    }
}

/// Convenience alias used throughout `baiturrahim-core`.
pub type AuthResult<T> = Result<T, AuthError>;
