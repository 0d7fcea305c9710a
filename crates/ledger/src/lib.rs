//! Kolo Ledger - Append-only money-movement entries
//!
//! Every movement of money is recorded as a `LedgerEntry`. No stored
//! balance is the source of truth: every balance is a fold over entries
//! (see `balance`).
//!
//! # Key Types
//! - `LedgerEntry`: one money-movement event (owner, scope, kind, amount, fee)
//! - `EntryKind` / `EntryStatus`: classification and lifecycle
//! - `LedgerEntryBuilder`: the only way to construct entries
//! - `balance`: wallet and subscription balance folds

pub mod balance;
pub mod entry;
pub mod error;

pub use balance::{subscription_flat_balance, wallet_balance};
pub use entry::{EntryKind, EntryStatus, LedgerEntry, LedgerEntryBuilder};
pub use error::LedgerError;
