use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::authz::{AccessDecision, Action, DecisionReason};
use crate::resource::ResourceKind;

/// One line of audit trail: who asked for what, what was decided, and what
/// the wire saw.
///
/// `allowed` and `reason` record the authorization outcome; `status` records
/// the final HTTP-shaped status, which may still be 400 or 404 after an
/// allow if the payload or the resource lets the handler down.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// Unique record id, `aud_<uuid>`.
    pub id: String,
    /// Decision time.
    pub time: DateTime<Utc>,
    /// Verified subject, absent for unauthenticated requests.
    pub subject: Option<String>,
    pub kind: ResourceKind,
    pub resource_id: String,
    pub action: Action,
    pub allowed: bool,
    pub reason: DecisionReason,
    pub status: u16,
}

impl AuditRecord {
    pub(crate) fn new(
        time: DateTime<Utc>,
        subject: Option<&str>,
        kind: ResourceKind,
        resource_id: &str,
        action: Action,
        decision: &AccessDecision,
        status: u16,
    ) -> Self {
        Self {
            id: format!("aud_{}", Uuid::new_v4()),
            time,
            subject: subject.map(str::to_string),
            kind,
            resource_id: resource_id.to_string(),
            action,
            allowed: decision.allowed,
            reason: decision.reason,
            status,
        }
    }
}

/// Where audit records go. Implementations must be cheap and must not fail;
/// auditing sits on the request path.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Default sink: one structured log event per record.
///
/// Denied requests log at info, allowed ones at debug, so a default
/// `info`-level filter shows exactly the traffic worth looking at.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, record: &AuditRecord) {
        if record.allowed {
            tracing::debug!(
                audit_id = %record.id,
                subject = record.subject.as_deref().unwrap_or("-"),
                kind = %record.kind,
                resource_id = %record.resource_id,
                action = %record.action,
                status = record.status,
                "access allowed"
            );
        } else {
            tracing::info!(
                audit_id = %record.id,
                subject = record.subject.as_deref().unwrap_or("-"),
                kind = %record.kind,
                resource_id = %record.resource_id,
                action = %record.action,
                reason = %record.reason,
                status = record.status,
                "access denied"
            );
        }
    }
}

/// Test sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemorySink {
    fn record(&self, record: &AuditRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(allowed: bool) -> AuditRecord {
        let decision = if allowed {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(DecisionReason::Forbidden)
        };
        AuditRecord::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            Some("2"),
            ResourceKind::Profile,
            "1",
            Action::Read,
            &decision,
            if allowed { 200 } else { 403 },
        )
    }

    #[test]
    fn record_ids_are_unique_and_prefixed() {
        let a = sample(true);
        let b = sample(true);
        assert!(a.id.starts_with("aud_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn memory_sink_keeps_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.record(&sample(true));
        sink.record(&sample(false));
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].allowed);
        assert_eq!(records[1].reason, DecisionReason::Forbidden);
        assert_eq!(records[1].status, 403);
    }

    #[test]
    fn records_serialize_with_wire_casing() {
        let record = sample(false);
        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["reason"], "FORBIDDEN");
        assert_eq!(wire["action"], "read");
        assert_eq!(wire["kind"], "profile");
    }

    #[test]
    fn tracing_sink_accepts_records_without_a_subscriber() {
        TracingSink.record(&sample(true));
        TracingSink.record(&sample(false));
    }
}
