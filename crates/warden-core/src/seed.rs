use std::collections::HashMap;

use serde_json::json;
use warden_token::Role;

use crate::resource::{Resource, ResourceKind};
use crate::store::ResourceStore;

/// Maps subject ids to the role they log in with.
///
/// This is the whole identity backend: no passwords, no sessions. A subject
/// that appears here can obtain a token; everyone else cannot log in at all.
#[derive(Debug, Clone, Default)]
pub struct SubjectDirectory {
    roles: HashMap<String, Role>,
}

impl SubjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`register`].
    ///
    /// [`register`]: SubjectDirectory::register
    pub fn with_subject(mut self, subject_id: impl Into<String>, role: Role) -> Self {
        self.register(subject_id, role);
        self
    }

    pub fn register(&mut self, subject_id: impl Into<String>, role: Role) {
        self.roles.insert(subject_id.into(), role);
    }

    pub fn role_of(&self, subject_id: &str) -> Option<Role> {
        self.roles.get(subject_id).copied()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// The demo identity set: three plain users and one admin.
pub fn demo_directory() -> SubjectDirectory {
    SubjectDirectory::new()
        .with_subject("1", Role::User)
        .with_subject("2", Role::User)
        .with_subject("3", Role::User)
        .with_subject("999", Role::Admin)
}

/// Seeds `store` with one profile per demo subject and a few orders.
///
/// Profile ids equal their owner's subject id; order ids live in their own
/// number range and are owned by the matching user.
pub fn seed_demo_store(store: &ResourceStore) {
    let profiles = [
        ("1", "Alice", "alice@example.com"),
        ("2", "Bob", "bob@example.com"),
        ("3", "Charlie", "charlie@example.com"),
        ("999", "Admin", "admin@example.com"),
    ];
    for (id, name, email) in profiles {
        store.insert(
            Resource::new(ResourceKind::Profile, id, id)
                .with_field("name", json!(name))
                .with_field("email", json!(email)),
        );
    }

    let orders = [
        ("1001", "1", "mechanical keyboard", 129.95),
        ("1002", "2", "ergonomic mouse", 49.50),
        ("1003", "3", "4k monitor", 389.00),
    ];
    for (id, owner, item, total) in orders {
        store.insert(
            Resource::new(ResourceKind::Order, id, owner)
                .with_field("item", json!(item))
                .with_field("total", json!(total)),
        );
    }
}
