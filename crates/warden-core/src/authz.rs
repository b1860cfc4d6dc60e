use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_token::Principal;

use crate::resource::ResourceKind;
use crate::store::ResourceStore;

/// What the caller wants to do with the resource.
///
/// Reads and writes are authorized identically; the split exists so audit
/// records and future policies can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason attached to every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    /// Access granted.
    Ok,
    /// No verified principal accompanied the request.
    NotAuthenticated,
    /// The resource does not exist, and the policy allows saying so.
    NotFound,
    /// The principal is neither the owner nor an admin.
    Forbidden,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Ok => "OK",
            DecisionReason::NotAuthenticated => "NOT_AUTHENTICATED",
            DecisionReason::NotFound => "NOT_FOUND",
            DecisionReason::Forbidden => "FORBIDDEN",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Ok,
        }
    }

    /// Builds a denial. `Ok` is not a denial reason; passing it yields a
    /// `Forbidden` denial, so a deny can never carry the success reason.
    pub fn deny(reason: DecisionReason) -> Self {
        let reason = if reason == DecisionReason::Ok {
            DecisionReason::Forbidden
        } else {
            reason
        };
        Self {
            allowed: false,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// One authorization question: may `principal` perform `action` on the
/// resource at `(kind, resource_id)`?
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    pub principal: &'a Principal,
    pub kind: ResourceKind,
    pub resource_id: &'a str,
    pub action: Action,
}

/// How the engine answers for resources that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistencePolicy {
    /// Existence is not a secret: a missing resource is `NOT_FOUND` for any
    /// authenticated caller, before ownership is considered.
    #[default]
    Reveal,
    /// Existence is hidden from non-owners: non-admins get `FORBIDDEN` for
    /// anything they do not own, whether or not it exists, so a denial
    /// carries no information about the id space.
    Mask,
}

impl ExistencePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExistencePolicy::Reveal => "reveal",
            ExistencePolicy::Mask => "mask",
        }
    }
}

impl fmt::Display for ExistencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an existence policy name.
#[derive(Debug, Error)]
#[error("unknown existence policy: {0} (expected \"reveal\" or \"mask\")")]
pub struct UnknownExistencePolicy(pub String);

impl FromStr for ExistencePolicy {
    type Err = UnknownExistencePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reveal" => Ok(ExistencePolicy::Reveal),
            "mask" => Ok(ExistencePolicy::Mask),
            other => Err(UnknownExistencePolicy(other.to_string())),
        }
    }
}

/// Object-level authorization engine.
///
/// The engine is pure: it reads the store, never writes it, and returns a
/// decision instead of performing the action. Both outcomes are ordinary
/// values, not errors, so callers cannot forget to branch on them with `?`.
///
/// Decision order for an authenticated principal:
/// 1. look up the resource,
/// 2. admins may act on anything that exists,
/// 3. owners may act on their own resources,
/// 4. everyone else is denied.
///
/// Where the missing-resource answer lands in that order depends on the
/// [`ExistencePolicy`].
#[derive(Debug, Clone)]
pub struct AuthzEngine {
    existence_policy: ExistencePolicy,
}

impl AuthzEngine {
    pub fn new(existence_policy: ExistencePolicy) -> Self {
        Self { existence_policy }
    }

    pub fn existence_policy(&self) -> ExistencePolicy {
        self.existence_policy
    }

    /// Decides an access request, treating `None` as an unauthenticated
    /// caller.
    ///
    /// Authentication is checked first: without a principal the answer is
    /// `NOT_AUTHENTICATED` no matter what the id names, so unauthenticated
    /// probing cannot distinguish existing ids from missing ones.
    pub fn decide(
        &self,
        principal: Option<&Principal>,
        kind: ResourceKind,
        resource_id: &str,
        action: Action,
        store: &ResourceStore,
    ) -> AccessDecision {
        let Some(principal) = principal else {
            return AccessDecision::deny(DecisionReason::NotAuthenticated);
        };
        self.decide_request(
            &AccessRequest {
                principal,
                kind,
                resource_id,
                action,
            },
            store,
        )
    }

    /// Decides an access request for a verified principal.
    pub fn decide_request(
        &self,
        request: &AccessRequest<'_>,
        store: &ResourceStore,
    ) -> AccessDecision {
        let lookup = store.get(request.kind, request.resource_id);
        let principal = request.principal;

        match self.existence_policy {
            ExistencePolicy::Reveal => {
                let Ok(resource) = lookup else {
                    return AccessDecision::deny(DecisionReason::NotFound);
                };
                if principal.is_admin() || resource.owner_id == principal.subject_id {
                    AccessDecision::allow()
                } else {
                    AccessDecision::deny(DecisionReason::Forbidden)
                }
            }
            ExistencePolicy::Mask => {
                if principal.is_admin() {
                    return match lookup {
                        Ok(_) => AccessDecision::allow(),
                        Err(_) => AccessDecision::deny(DecisionReason::NotFound),
                    };
                }
                match lookup {
                    Ok(resource) if resource.owner_id == principal.subject_id => {
                        AccessDecision::allow()
                    }
                    // Missing and foreign are deliberately indistinguishable.
                    _ => AccessDecision::deny(DecisionReason::Forbidden),
                }
            }
        }
    }
}
