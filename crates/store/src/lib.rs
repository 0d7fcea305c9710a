//! Kolo Store - persistence boundary for ledger entries, subscriptions and loans
//!
//! The engines are stateless; every durable read-modify-write funnels
//! through the `LedgerStore` trait. The atomic plan-credit operation lives
//! behind `PlanCredit`: credit the subscription, advance its cycle
//! metadata and append the ledger entry as one unit, serialized per
//! subscription.
//!
//! Two implementations:
//! - `MemoryStore`: mutex-guarded maps, the test and demo backbone
//! - `SqliteStore`: sqlx + SQLite, one transaction per plan credit

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{LedgerStore, PlanCredit, PlanCreditReceipt, PlanCreditRequest};
