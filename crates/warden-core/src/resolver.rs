use chrono::{DateTime, Utc};
use thiserror::Error;
use warden_token::{Principal, TokenCodec};

/// The one and only authentication failure callers get to see.
///
/// Whether a token was missing, truncated, forged, signed with yesterday's
/// key or simply expired, the caller-visible outcome is identical. Anything
/// finer would hand an attacker a probing oracle; the precise reason still
/// lands in the logs at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not authenticated")]
pub struct NotAuthenticated;

/// Turns raw bearer tokens into verified [`Principal`]s.
#[derive(Debug, Clone)]
pub struct PrincipalResolver {
    codec: TokenCodec,
}

impl PrincipalResolver {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// The codec this resolver verifies against, for issuing tokens under
    /// the same key.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolves `raw_token` against the current wall clock.
    pub fn resolve(&self, raw_token: &str) -> Result<Principal, NotAuthenticated> {
        self.resolve_at(Utc::now(), raw_token)
    }

    /// Resolves `raw_token` as of `now`.
    ///
    /// Every codec error is collapsed to [`NotAuthenticated`]; the
    /// underlying error never reaches the caller.
    pub fn resolve_at(
        &self,
        now: DateTime<Utc>,
        raw_token: &str,
    ) -> Result<Principal, NotAuthenticated> {
        match self.codec.verify_at(now, raw_token) {
            Ok(principal) => {
                tracing::debug!(
                    subject = %principal.subject_id,
                    role = %principal.role,
                    "principal resolved"
                );
                Ok(principal)
            }
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                Err(NotAuthenticated)
            }
        }
    }
}
