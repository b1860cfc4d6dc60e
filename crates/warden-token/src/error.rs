use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while decoding or verifying a token.
///
/// Callers that sit on an authentication boundary should not forward these
/// to the wire; see `warden-core`'s resolver, which collapses every variant
/// into a single opaque rejection.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token does not have the expected compact shape, or a segment
    /// failed to decode or parse.
    #[error("malformed token: {reason}")]
    Malformed { reason: String },

    /// The MAC does not match the received header and claims bytes.
    #[error("token signature mismatch")]
    InvalidSignature,

    /// The token is older than the configured maximum age.
    #[error("token expired: issued_at={issued_at}, now={now}")]
    Expired {
        issued_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

impl TokenError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TokenError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Errors raised while constructing a [`SigningSecret`] from caller-provided
/// material.
///
/// [`SigningSecret`]: crate::secret::SigningSecret
#[derive(Debug, Error)]
pub enum SecretError {
    /// The decoded secret is not exactly the required length.
    #[error("signing secret must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The secret string is not valid hex.
    #[error("signing secret is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Convenience alias for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
