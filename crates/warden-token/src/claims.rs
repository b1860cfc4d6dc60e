use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role granted to a subject when its token is issued.
///
/// Roles are coarse: `Admin` may act on any resource, `User` only on
/// resources it owns. There is no finer-grained permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a role string that is neither `user` nor
/// `admin`.
#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Wire form of the signed claims segment.
///
/// Unknown fields are tolerated on decode so that tokens minted by newer
/// issuers still verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// Subject id the token speaks for.
    pub sub: String,
    /// Role granted at issue time.
    pub role: Role,
    /// Issue time as unix seconds.
    pub iat: i64,
}

/// An authenticated caller.
///
/// A `Principal` is only ever produced by [`TokenCodec::verify`], so holding
/// one means the token's MAC held and its lifetime had not elapsed. The
/// subject id and role are attacker-supplied *claims* until that point and
/// trusted afterwards.
///
/// [`TokenCodec::verify`]: crate::codec::TokenCodec::verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Verified subject id.
    pub subject_id: String,
    /// Verified role.
    pub role: Role,
    /// Issue time, truncated to whole seconds.
    pub issued_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
