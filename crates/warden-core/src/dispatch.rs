use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use warden_token::{Role, SigningSecret, TokenCodec};

use crate::audit::{AuditRecord, AuditSink, TracingSink};
use crate::authz::{Action, AuthzEngine, DecisionReason};
use crate::config::WardenConfig;
use crate::resolver::PrincipalResolver;
use crate::resource::{Resource, ResourceKind};
use crate::seed::{demo_directory, seed_demo_store, SubjectDirectory};
use crate::store::ResourceStore;

/// Request methods the API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
        }
    }

    /// The action class this method is authorized as.
    pub fn action(self) -> Action {
        match self {
            Method::Get => Action::Read,
            Method::Put => Action::Write,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a method the API does not serve.
#[derive(Debug, Error)]
#[error("unsupported method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Method::Get)
        } else if s.eq_ignore_ascii_case("PUT") {
            Ok(Method::Put)
        } else {
            Err(UnsupportedMethod(s.to_string()))
        }
    }
}

/// HTTP-shaped outcome of one dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// 200 with the resource as the body.
    pub fn ok(resource: &Resource) -> Self {
        Self {
            status: 200,
            body: serde_json::to_value(resource).expect("resource serializes to JSON"),
        }
    }

    /// Denial mapped to its wire status, with a machine-readable error code
    /// and a fixed human-readable message. `Ok` is not a denial; passing it
    /// yields the `Forbidden` response, so a denial can never read as a
    /// success.
    pub fn denied(reason: DecisionReason) -> Self {
        let reason = if reason == DecisionReason::Ok {
            DecisionReason::Forbidden
        } else {
            reason
        };
        let (status, message) = match reason {
            DecisionReason::NotAuthenticated => (401, "missing or invalid token"),
            DecisionReason::Ok | DecisionReason::Forbidden => (403, "you do not own this resource"),
            DecisionReason::NotFound => (404, "resource not found"),
        };
        Self {
            status,
            body: json!({ "error_code": reason.as_str(), "error": message }),
        }
    }

    /// 400 for a payload that is not a JSON object. Only reachable after
    /// authorization allowed the write.
    pub fn malformed(detail: &str) -> Self {
        Self {
            status: 400,
            body: json!({ "error_code": "MALFORMED_PAYLOAD", "error": detail }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Front door of the resource API.
///
/// Every request runs the same pipeline: resolve the token, authorize the
/// access, and only then touch the store. Nothing is read from or written
/// to a resource before the decision allows it, and a PUT payload is not
/// even parsed until then, so a denied request has no observable effect
/// beyond its status code and an audit record.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: PrincipalResolver,
    engine: AuthzEngine,
    store: ResourceStore,
    directory: SubjectDirectory,
    audit: Arc<dyn AuditSink>,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty store and directory.
    pub fn new(secret: SigningSecret, config: WardenConfig) -> Self {
        let codec = TokenCodec::new(secret).with_max_token_age(config.max_token_age());
        Self {
            resolver: PrincipalResolver::new(codec),
            engine: AuthzEngine::new(config.existence_policy),
            store: ResourceStore::new(),
            directory: SubjectDirectory::new(),
            audit: Arc::new(TracingSink),
        }
    }

    /// Creates a dispatcher pre-loaded with the demo subjects and their
    /// resources.
    pub fn with_demo_seed(secret: SigningSecret, config: WardenConfig) -> Self {
        let mut dispatcher = Self::new(secret, config);
        dispatcher.directory = demo_directory();
        seed_demo_store(&dispatcher.store);
        dispatcher
    }

    /// Replaces the audit sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// The backing store, shared with every clone of this dispatcher.
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Identifier of the signing key, safe to log at startup.
    pub fn key_id(&self) -> String {
        self.resolver.codec().key_id()
    }

    pub fn register_subject(&mut self, subject_id: impl Into<String>, role: Role) {
        self.directory.register(subject_id, role);
    }

    /// Logs a subject in by id and returns a fresh token, or `None` for ids
    /// the directory does not know.
    pub fn login(&self, subject_id: &str) -> Option<String> {
        self.login_at(Utc::now(), subject_id)
    }

    pub fn login_at(&self, now: DateTime<Utc>, subject_id: &str) -> Option<String> {
        let Some(role) = self.directory.role_of(subject_id) else {
            tracing::debug!(subject = %subject_id, "login rejected, unknown subject");
            return None;
        };
        tracing::debug!(subject = %subject_id, role = %role, "login");
        Some(self.resolver.codec().issue_at(now, subject_id, role))
    }

    /// Issues a token directly, bypassing the directory.
    ///
    /// Exists for tooling and tests that need an arbitrary subject or role;
    /// the normal path is [`login`].
    ///
    /// [`login`]: Dispatcher::login
    pub fn issue_token(&self, subject_id: &str, role: Role) -> String {
        self.resolver.codec().issue(subject_id, role)
    }

    pub fn issue_token_at(&self, now: DateTime<Utc>, subject_id: &str, role: Role) -> String {
        self.resolver.codec().issue_at(now, subject_id, role)
    }

    /// Dispatches one request against the current wall clock.
    ///
    /// `token` is the raw bearer token, if the caller presented one.
    /// `payload` is the raw request body; it is only interpreted for PUT,
    /// and only after authorization.
    pub fn dispatch(
        &self,
        method: Method,
        kind: ResourceKind,
        resource_id: &str,
        token: Option<&str>,
        payload: Option<&str>,
    ) -> ApiResponse {
        self.dispatch_at(Utc::now(), method, kind, resource_id, token, payload)
    }

    /// Dispatches one request as of `now`.
    pub fn dispatch_at(
        &self,
        now: DateTime<Utc>,
        method: Method,
        kind: ResourceKind,
        resource_id: &str,
        token: Option<&str>,
        payload: Option<&str>,
    ) -> ApiResponse {
        let principal = token.and_then(|t| self.resolver.resolve_at(now, t).ok());
        let action = method.action();
        let decision = self
            .engine
            .decide(principal.as_ref(), kind, resource_id, action, &self.store);

        let response = if decision.is_allowed() {
            self.execute(method, kind, resource_id, payload)
        } else {
            ApiResponse::denied(decision.reason)
        };

        self.audit.record(&AuditRecord::new(
            now,
            principal.as_ref().map(|p| p.subject_id.as_str()),
            kind,
            resource_id,
            action,
            &decision,
            response.status,
        ));
        response
    }

    /// Performs an already-authorized request.
    fn execute(
        &self,
        method: Method,
        kind: ResourceKind,
        resource_id: &str,
        payload: Option<&str>,
    ) -> ApiResponse {
        match method {
            Method::Get => match self.store.get(kind, resource_id) {
                Ok(resource) => ApiResponse::ok(&resource),
                // The store has no delete, but answer honestly if the
                // lookup ever races one.
                Err(_) => ApiResponse::denied(DecisionReason::NotFound),
            },
            Method::Put => {
                let partial = match parse_object(payload) {
                    Ok(map) => map,
                    Err(detail) => return ApiResponse::malformed(&detail),
                };
                match self.store.update(kind, resource_id, &partial) {
                    Ok(resource) => ApiResponse::ok(&resource),
                    Err(_) => ApiResponse::denied(DecisionReason::NotFound),
                }
            }
        }
    }
}

/// Parses a PUT body. A missing body is treated as the empty object, which
/// makes the update a no-op rather than an error.
fn parse_object(payload: Option<&str>) -> Result<Map<String, Value>, String> {
    let raw = payload.unwrap_or("{}");
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("payload is not JSON: {e}"))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err("payload must be a JSON object".to_string()),
    }
}
