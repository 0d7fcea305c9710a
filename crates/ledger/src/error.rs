//! Ledger errors

use crate::entry::EntryStatus;
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Entry is immutable once {from}; cannot move to {to}")]
    InvalidStatusTransition { from: EntryStatus, to: EntryStatus },

    #[error("Entry must have an owner")]
    MissingOwner,

    #[error("Entry must have a kind")]
    MissingKind,

    #[error("Entry must have an amount")]
    MissingAmount,
}
