//! Store errors

use kolo_ledger::LedgerError;
use kolo_plans::PlanError;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the persistence boundary. `Database` is the transient,
/// caller-retryable class; `Plan` failures inside a plan credit abort the
/// whole operation with no partial metadata mutation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(Uuid),

    #[error("Plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error("Loan not found: {0}")]
    LoanNotFound(Uuid),

    #[error("Ledger entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Stored decimal is malformed: {0}")]
    MalformedDecimal(String),

    #[error("Stored row is corrupt in column {column}: {value}")]
    CorruptRow { column: &'static str, value: String },
}
