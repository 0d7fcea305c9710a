//! Deposit errors

use kolo_plans::PlanError;
use kolo_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors from routing a deposit. Every validation variant carries the
/// violated threshold so the caller can render a precise message.
#[derive(Error, Debug)]
pub enum DepositError {
    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Amount is below the mandated contribution of {mandated}")]
    BelowMandated { mandated: Decimal },

    #[error("Amount is below the plan minimum of {minimum}")]
    BelowMinimum { minimum: Decimal },

    #[error("Insufficient wallet balance: {available} available, {requested} requested")]
    InsufficientWallet {
        available: Decimal,
        requested: Decimal,
    },

    #[error("A wallet transfer into a plan requires a subscription")]
    MissingSubscription,

    /// The wallet debit committed but the plan credit did not. The deposit
    /// is queued for reconciliation; this is not a validation failure.
    #[error("Plan credit failed after wallet debit {debit_entry}: {reason}")]
    PlanCreditFailure { debit_entry: Uuid, reason: String },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Ledger(#[from] kolo_ledger::LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
