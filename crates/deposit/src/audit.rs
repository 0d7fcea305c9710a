//! Audit trail and the reconciliation queue
//!
//! Every successful deposit leaves an audit record. A plan credit that
//! fails after its wallet debit committed leaves a reconciliation task
//! instead of rolling the debit back; an operator (or a retry job) works
//! the queue off.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;
use uuid::Uuid;

/// One audited action.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub actor: Uuid,
    pub action: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// In-process audit log.
#[derive(Debug, Default)]
pub struct AuditTrail {
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditTrail {
    pub fn record(&self, actor: Uuid, action: impl Into<String>, detail: impl Into<String>) {
        let record = AuditRecord {
            actor,
            action: action.into(),
            detail: detail.into(),
            at: Utc::now(),
        };
        tracing::info!(actor = %record.actor, action = %record.action, detail = %record.detail, "audit");
        self.records
            .lock()
            .expect("audit trail mutex poisoned")
            .push(record);
    }

    pub fn snapshot(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .expect("audit trail mutex poisoned")
            .clone()
    }
}

/// A deposit whose wallet debit committed but whose plan credit failed.
/// The debit entry is the anchor: re-crediting or refunding starts there.
#[derive(Debug, Clone)]
pub struct ReconciliationTask {
    pub debit_entry: Uuid,
    pub subscription: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Queue of partial-failure deposits awaiting repair.
#[derive(Debug, Default)]
pub struct ReconciliationQueue {
    tasks: Mutex<Vec<ReconciliationTask>>,
}

impl ReconciliationQueue {
    pub fn enqueue(&self, task: ReconciliationTask) {
        tracing::error!(
            debit_entry = %task.debit_entry,
            subscription = %task.subscription,
            reason = %task.reason,
            "plan credit failed after wallet debit; queued for reconciliation"
        );
        self.tasks
            .lock()
            .expect("reconciliation queue mutex poisoned")
            .push(task);
    }

    pub fn drain(&self) -> Vec<ReconciliationTask> {
        std::mem::take(
            &mut *self
                .tasks
                .lock()
                .expect("reconciliation queue mutex poisoned"),
        )
    }

    pub fn len(&self) -> usize {
        self.tasks
            .lock()
            .expect("reconciliation queue mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
