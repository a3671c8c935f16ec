//! Append-only audit trail boundary.
//!
//! Every mutating call records who did what to which record. Auditing is
//! traceability, not correctness: a sink failure never fails the operation.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

use clubledger_core::UserId;

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub actor: UserId,
    /// Stable action name (e.g. "sale.create").
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: String,
    /// Structured detail payload (amounts, line counts, deltas).
    pub detail: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

/// Append-only audit sink.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Audit sink that emits records into the tracing pipeline.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        info!(
            actor = %record.actor,
            action = record.action,
            entity_type = record.entity_type,
            entity_id = %record.entity_id,
            detail = %record.detail,
            "audit"
        );
    }
}

/// Audit sink that collects records in memory (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in append order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
