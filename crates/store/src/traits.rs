//! Store traits - the persistence boundary and the plan-credit contract

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kolo_ledger::{EntryStatus, LedgerEntry};
use kolo_loan::Loan;
use kolo_plans::{CycleAdvance, Plan, PlanSubscription};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Persistence boundary for entries, plans, subscriptions and loans.
///
/// Suspension only happens here; everything above is synchronous
/// request-scoped evaluation.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append_entry(&self, entry: LedgerEntry) -> Result<Uuid, StoreError>;

    /// The single permitted entry mutation: pending -> completed/failed.
    async fn set_entry_status(&self, id: Uuid, status: EntryStatus) -> Result<(), StoreError>;

    /// All entries owned by `owner`, wallet and subscription scopes alike.
    async fn entries_for_owner(&self, owner: Uuid) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn entries_for_scope(&self, scope: Uuid) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn insert_plan(&self, plan: Plan) -> Result<(), StoreError>;
    async fn get_plan(&self, id: Uuid) -> Result<Plan, StoreError>;

    async fn insert_subscription(&self, sub: PlanSubscription) -> Result<(), StoreError>;
    async fn get_subscription(&self, id: Uuid) -> Result<PlanSubscription, StoreError>;
    async fn save_subscription(&self, sub: &PlanSubscription) -> Result<(), StoreError>;
    async fn subscriptions_for_user(&self, user: Uuid) -> Result<Vec<PlanSubscription>, StoreError>;

    async fn insert_loan(&self, loan: Loan) -> Result<(), StoreError>;
    async fn save_loan(&self, loan: &Loan) -> Result<(), StoreError>;
    async fn loans_for_user(&self, user: Uuid) -> Result<Vec<Loan>, StoreError>;
}

/// Input to the atomic plan-credit operation.
#[derive(Debug, Clone, Copy)]
pub struct PlanCreditRequest {
    pub user: Uuid,
    pub subscription: Uuid,
    /// Gross contribution; the store computes and deducts the fee
    pub amount: Decimal,
    pub now: DateTime<Utc>,
}

/// Structured response: what the credit did, for caller messaging.
#[derive(Debug, Clone)]
pub struct PlanCreditReceipt {
    pub entry_id: Uuid,
    pub fee: Decimal,
    pub advance: CycleAdvance,
    pub new_balance: Decimal,
}

/// The atomic plan-credit operation (one per archetype, dispatched on the
/// subscription's plan). As one unit: credit the subscription balance by
/// `amount - fee`, advance/top up the cycle counters, reduce arrears and
/// append the subscription-scope ledger entry. Must fail atomically - no
/// partial metadata mutation on any internal error.
///
/// Implementations must serialize concurrent calls against the same
/// subscription: cycle counters and arrears are read-modify-write.
#[async_trait]
pub trait PlanCredit: Send + Sync {
    async fn apply_plan_credit(
        &self,
        req: PlanCreditRequest,
    ) -> Result<PlanCreditReceipt, StoreError>;
}
