//! Kolo Deposit - contribution routing
//!
//! The router is the only writer of deposit-side ledger entries. It
//! validates the amount against the target plan's rules, picks the flow
//! for the channel and archetype, and leaves an audit record for every
//! success and a reconciliation task for every partial failure.

pub mod audit;
pub mod error;
pub mod router;

pub use audit::{AuditRecord, AuditTrail, ReconciliationQueue, ReconciliationTask};
pub use error::DepositError;
pub use router::{DepositChannel, DepositOutcome, DepositRequest, DepositRouter};
