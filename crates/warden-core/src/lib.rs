//! Ownership-checked resource API.
//!
//! `warden-core` is the reference implementation of object-level
//! authorization over a small resource API: profiles and orders, each tagged
//! with the subject that owns it. Holding a valid token is never enough to
//! touch a resource; every request is authorized against the resource's
//! owner, so swapping the id in a request for someone else's id yields a 403
//! instead of their data.
//!
//! The pieces, in request order:
//! - [`PrincipalResolver`]: verifies the bearer token and collapses every
//!   failure into one opaque rejection
//! - [`AuthzEngine`]: decides ownership-or-admin access against the store
//! - [`ResourceStore`]: in-memory resources, with identity fields that a
//!   partial update can never touch
//! - [`Dispatcher`]: runs the pipeline and maps decisions to wire statuses
//!   (200, 400, 401, 403, 404), auditing every request
//!
//! # Example
//!
//! ```
//! use warden_core::{Dispatcher, Method, ResourceKind, WardenConfig};
//! use warden_token::SigningSecret;
//!
//! let dispatcher = Dispatcher::with_demo_seed(SigningSecret::generate(), WardenConfig::default());
//! let token = dispatcher.login("2").unwrap();
//!
//! // Own profile: allowed.
//! let own = dispatcher.dispatch(Method::Get, ResourceKind::Profile, "2", Some(&token), None);
//! assert_eq!(own.status, 200);
//!
//! // Someone else's profile: denied, not leaked.
//! let foreign = dispatcher.dispatch(Method::Get, ResourceKind::Profile, "1", Some(&token), None);
//! assert_eq!(foreign.status, 403);
//! ```

pub mod audit;
pub mod authz;
pub mod config;
pub mod dispatch;
pub mod resolver;
pub mod resource;
pub mod seed;
pub mod store;

pub use audit::{AuditRecord, AuditSink, MemorySink, TracingSink};
pub use authz::{
    AccessDecision, AccessRequest, Action, AuthzEngine, DecisionReason, ExistencePolicy,
    UnknownExistencePolicy,
};
pub use config::{WardenConfig, EXISTENCE_POLICY_ENV, MAX_TOKEN_AGE_ENV};
pub use dispatch::{ApiResponse, Dispatcher, Method, UnsupportedMethod};
pub use resolver::{NotAuthenticated, PrincipalResolver};
pub use resource::{Resource, ResourceKind, UnknownResourceKind};
pub use seed::{demo_directory, seed_demo_store, SubjectDirectory};
pub use store::{ResourceStore, StoreError, StoreResult};

// Token types cross this crate's public API, so re-export them.
pub use warden_token::{Principal, Role, SigningSecret, TokenCodec, TokenError};
