use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The kinds of resource the API serves.
///
/// Every kind is ownership-tagged and authorized the same way; the kind only
/// selects the namespace an id is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Profile,
    Order,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Profile => "profile",
            ResourceKind::Order => "order",
        }
    }

    /// Path segment the kind is addressed by, e.g. `/api/profile/2` and
    /// `/api/orders/1002`.
    pub fn as_endpoint(&self) -> &'static str {
        match self {
            ResourceKind::Profile => "profile",
            ResourceKind::Order => "orders",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a path segment names no known resource kind.
#[derive(Debug, Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    /// Parses the endpoint form: `profile` or `orders`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(ResourceKind::Profile),
            "orders" => Ok(ResourceKind::Order),
            other => Err(UnknownResourceKind(other.to_string())),
        }
    }
}

/// An ownership-tagged object.
///
/// `id`, `owner_id` and `kind` form the immutable identity; everything the
/// owner may edit lives in `data`. The wire form uses camelCase so `owner_id`
/// serializes as `ownerId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub owner_id: String,
    pub kind: ResourceKind,
    /// Free-form owner-editable fields, flattened into the wire object.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Resource {
    pub fn new(
        kind: ResourceKind,
        id: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            kind,
            data: Map::new(),
        }
    }

    /// Adds one owner-editable field. Intended for seeding and tests.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}
