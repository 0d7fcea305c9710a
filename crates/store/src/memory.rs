//! In-memory store - test and demo backbone
//!
//! One mutex guards all state, so a plan credit is trivially atomic and
//! concurrent credits against the same subscription serialize.

use crate::error::StoreError;
use crate::traits::{LedgerStore, PlanCredit, PlanCreditReceipt, PlanCreditRequest};
use async_trait::async_trait;
use kolo_core::Amount;
use kolo_ledger::{EntryKind, EntryStatus, LedgerEntry, LedgerEntryBuilder};
use kolo_loan::Loan;
use kolo_plans::{apply_credit, Plan, PlanError, PlanSubscription, RuleEngine, SubscriptionStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    entries: Vec<LedgerEntry>,
    plans: HashMap<Uuid, Plan>,
    subscriptions: HashMap<Uuid, PlanSubscription>,
    loans: HashMap<Uuid, Loan>,
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    engine: RuleEngine,
}

impl MemoryStore {
    pub fn new(engine: RuleEngine) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            engine,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens after a panic in a holder; tests are
        // the only concurrent users, so propagate the panic.
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append_entry(&self, entry: LedgerEntry) -> Result<Uuid, StoreError> {
        let id = entry.id;
        self.lock().entries.push(entry);
        Ok(id)
    }

    async fn set_entry_status(&self, id: Uuid, status: EntryStatus) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::EntryNotFound(id))?;
        entry.transition(status)?;
        Ok(())
    }

    async fn entries_for_owner(&self, owner: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect())
    }

    async fn entries_for_scope(&self, scope: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|e| e.scope == Some(scope))
            .cloned()
            .collect())
    }

    async fn insert_plan(&self, plan: Plan) -> Result<(), StoreError> {
        self.lock().plans.insert(plan.id, plan);
        Ok(())
    }

    async fn get_plan(&self, id: Uuid) -> Result<Plan, StoreError> {
        self.lock()
            .plans
            .get(&id)
            .cloned()
            .ok_or(StoreError::PlanNotFound(id))
    }

    async fn insert_subscription(&self, sub: PlanSubscription) -> Result<(), StoreError> {
        self.lock().subscriptions.insert(sub.id, sub);
        Ok(())
    }

    async fn get_subscription(&self, id: Uuid) -> Result<PlanSubscription, StoreError> {
        self.lock()
            .subscriptions
            .get(&id)
            .cloned()
            .ok_or(StoreError::SubscriptionNotFound(id))
    }

    async fn save_subscription(&self, sub: &PlanSubscription) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.subscriptions.contains_key(&sub.id) {
            return Err(StoreError::SubscriptionNotFound(sub.id));
        }
        inner.subscriptions.insert(sub.id, sub.clone());
        Ok(())
    }

    async fn subscriptions_for_user(&self, user: Uuid) -> Result<Vec<PlanSubscription>, StoreError> {
        let mut subs: Vec<_> = self
            .lock()
            .subscriptions
            .values()
            .filter(|s| s.user_id == user)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.started_at);
        Ok(subs)
    }

    async fn insert_loan(&self, loan: Loan) -> Result<(), StoreError> {
        self.lock().loans.insert(loan.id, loan);
        Ok(())
    }

    async fn save_loan(&self, loan: &Loan) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.loans.contains_key(&loan.id) {
            return Err(StoreError::LoanNotFound(loan.id));
        }
        inner.loans.insert(loan.id, loan.clone());
        Ok(())
    }

    async fn loans_for_user(&self, user: Uuid) -> Result<Vec<Loan>, StoreError> {
        let mut loans: Vec<_> = self
            .lock()
            .loans
            .values()
            .filter(|l| l.user_id == user)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.created_at);
        Ok(loans)
    }
}

#[async_trait]
impl PlanCredit for MemoryStore {
    async fn apply_plan_credit(
        &self,
        req: PlanCreditRequest,
    ) -> Result<PlanCreditReceipt, StoreError> {
        // The whole read-modify-write sits under one lock: atomic, and
        // serialized per subscription.
        let mut inner = self.lock();

        let sub = inner
            .subscriptions
            .get(&req.subscription)
            .ok_or(StoreError::SubscriptionNotFound(req.subscription))?;
        if sub.status != SubscriptionStatus::Active {
            return Err(StoreError::Plan(PlanError::NotActive {
                subscription: sub.id,
                status: sub.status,
            }));
        }
        let plan = inner
            .plans
            .get(&sub.plan_id)
            .ok_or(StoreError::PlanNotFound(sub.plan_id))?;

        let fee = self.engine.contribution_fee(plan, req.amount);
        let net = req.amount - fee;
        // Cycle units count against the gross contribution; only the
        // balance is credited net of fee.
        let (new_metadata, advance) =
            apply_credit(&sub.metadata, plan, req.amount, req.now, self.engine.config())?;

        let entry = LedgerEntryBuilder::new()
            .owner(req.user)
            .scope(req.subscription)
            .kind(EntryKind::Deposit)
            .amount(Amount::new_unchecked(req.amount))
            .fee(Amount::new_unchecked(fee))
            .status(EntryStatus::Completed)
            .description(advance.to_string())
            .created_at(req.now)
            .build()?;
        let entry_id = entry.id;

        // Nothing has mutated until here; commit everything together.
        let new_balance = {
            let sub = inner
                .subscriptions
                .get_mut(&req.subscription)
                .ok_or(StoreError::SubscriptionNotFound(req.subscription))?;
            sub.metadata = new_metadata;
            sub.balance += net;
            sub.balance
        };
        inner.entries.push(entry);

        tracing::debug!(subscription = %req.subscription, %fee, advance = %advance, "plan credit applied");
        Ok(PlanCreditReceipt {
            entry_id,
            fee,
            advance,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kolo_plans::{ContributionMode, CycleMetadata, PlanArchetype};
    use rust_decimal_macros::dec;

    async fn seeded_monthly() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::default();
        let plan = Plan::new("m", PlanArchetype::MonthlyGoal, ContributionMode::Flexible)
            .with_fixed_amount(Amount::from_major(20000))
            .with_duration(6);
        let user = Uuid::new_v4();
        let sub = PlanSubscription::join(user, &plan, Utc::now()).unwrap();
        let sub_id = sub.id;
        store.insert_plan(plan).await.unwrap();
        store.insert_subscription(sub).await.unwrap();
        (store, user, sub_id)
    }

    #[tokio::test]
    async fn test_plan_credit_updates_balance_and_metadata() {
        let (store, user, sub_id) = seeded_monthly().await;
        store
            .apply_plan_credit(PlanCreditRequest {
                user,
                subscription: sub_id,
                amount: dec!(8000),
                now: Utc::now(),
            })
            .await
            .unwrap();
        let receipt = store
            .apply_plan_credit(PlanCreditRequest {
                user,
                subscription: sub_id,
                amount: dec!(12000),
                now: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(receipt.new_balance, dec!(20000));
        assert_eq!(receipt.fee, dec!(0));
        let sub = store.get_subscription(sub_id).await.unwrap();
        match sub.metadata {
            CycleMetadata::MonthlyGoal { months_completed, month_paid_so_far, .. } => {
                assert_eq!(months_completed, 1);
                assert_eq!(month_paid_so_far, dec!(0));
            }
            _ => panic!("wrong variant"),
        }
        let entries = store.entries_for_scope(sub_id).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_plan_credit_requires_active_subscription() {
        let (store, user, sub_id) = seeded_monthly().await;
        let mut sub = store.get_subscription(sub_id).await.unwrap();
        sub.status = SubscriptionStatus::Matured;
        store.save_subscription(&sub).await.unwrap();

        let err = store
            .apply_plan_credit(PlanCreditRequest {
                user,
                subscription: sub_id,
                amount: dec!(1000),
                now: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Plan(PlanError::NotActive { .. })));
    }

    #[tokio::test]
    async fn test_failed_credit_leaves_no_partial_state() {
        let (store, user, sub_id) = seeded_monthly().await;
        // Corrupt the metadata shape to force an ArchetypeMismatch inside
        // the credit step.
        let mut sub = store.get_subscription(sub_id).await.unwrap();
        sub.metadata = CycleMetadata::Standard;
        store.save_subscription(&sub).await.unwrap();

        let err = store
            .apply_plan_credit(PlanCreditRequest {
                user,
                subscription: sub_id,
                amount: dec!(5000),
                now: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Plan(PlanError::ArchetypeMismatch { .. })));

        let after = store.get_subscription(sub_id).await.unwrap();
        assert_eq!(after.balance, dec!(0));
        assert!(store.entries_for_scope(sub_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entry_status_mutation_rules() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let entry = LedgerEntryBuilder::new()
            .owner(owner)
            .kind(EntryKind::Withdrawal)
            .amount(Amount::from_major(500))
            .status(EntryStatus::Pending)
            .build()
            .unwrap();
        let id = store.append_entry(entry).await.unwrap();

        store.set_entry_status(id, EntryStatus::Completed).await.unwrap();
        let err = store.set_entry_status(id, EntryStatus::Failed).await.unwrap_err();
        assert!(matches!(err, StoreError::Ledger(_)));
    }
}
