use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::resource::{Resource, ResourceKind};

/// Identity fields that a partial update may never touch.
const PROTECTED_FIELDS: [&str; 3] = ["id", "ownerId", "kind"];

/// Errors raised by store lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No resource under this kind and id.
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },
}

/// Convenience alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// In-memory resource store, keyed by `(kind, id)`.
///
/// Ids are only unique within a kind, so `profile 1` and a hypothetical
/// `order 1` never collide. Handles are cheap to clone and share one map;
/// reads take a shared lock, writes an exclusive one.
///
/// The store knows nothing about callers. Ownership is data here and policy
/// in the authorization engine; nothing below this line ever checks a
/// principal.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    inner: Arc<RwLock<HashMap<(ResourceKind, String), Resource>>>,
}

impl ResourceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a resource under its own `(kind, id)`.
    pub fn insert(&self, resource: Resource) {
        let key = (resource.kind, resource.id.clone());
        self.inner.write().unwrap().insert(key, resource);
    }

    /// Returns a snapshot of the resource, or `NotFound`.
    pub fn get(&self, kind: ResourceKind, id: &str) -> StoreResult<Resource> {
        self.inner
            .read()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    /// Merges `partial` into the resource field by field and returns the
    /// updated snapshot.
    ///
    /// Identity fields (`id`, `ownerId`, `kind`) are silently discarded, so
    /// a caller-supplied payload can never re-parent or re-key a resource.
    /// Unknown fields are created; the update is not a replacement, fields
    /// absent from `partial` keep their values.
    pub fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        partial: &Map<String, Value>,
    ) -> StoreResult<Resource> {
        let mut inner = self.inner.write().unwrap();
        let resource = inner
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        for (field, value) in partial {
            if PROTECTED_FIELDS.contains(&field.as_str()) {
                tracing::debug!(kind = %kind, id = %id, field = %field, "discarding protected field in update");
                continue;
            }
            resource.data.insert(field.clone(), value.clone());
        }
        Ok(resource.clone())
    }

    /// Number of resources across all kinds.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
