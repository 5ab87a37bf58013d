//! Error types shared across services.
//!
//! Request-path services never surface these to handlers: verification
//! failures become `None`/`false` at the service boundary. They exist for
//! issuance paths (login, CLI) where a caller can act on them.

/// Failure to mint or decode a signed token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("token is expired")]
    Expired,

    #[error("token is bound to a different session")]
    SessionMismatch,
}

impl TokenError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Sign(_) => "sign",
            TokenError::Invalid(_) => "invalid",
            TokenError::Expired => "expired",
            TokenError::SessionMismatch => "session_mismatch",
        }
    }
}
