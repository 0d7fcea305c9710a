//! Application context - wires everything together

use chrono::{DateTime, Utc};
use kolo_core::Amount;
use kolo_deposit::DepositRouter;
use kolo_ledger::{wallet_balance, EntryKind, EntryStatus, LedgerEntryBuilder};
use kolo_loan::{
    BorrowerProfile, IdVerification, Loan, LoanAssessment, LoanConfig, LoanEligibilityEngine,
};
use kolo_plans::{
    break_plan, BreakOutcome, MaturityMonitor, Plan, PlanConfig, PlanSubscription, RuleEngine,
    StatusChange,
};
use kolo_store::{LedgerStore, PlanCredit, SqliteStore, StoreError};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Settled break: the money split plus the two ledger entries recording it.
#[derive(Debug, Clone)]
pub struct BreakSettlement {
    pub outcome: BreakOutcome,
    pub refund_entry: Uuid,
    pub penalty_entry: Option<Uuid>,
}

/// Application context - wires the store, engines, router and monitor.
pub struct AppContext<S> {
    store: Arc<S>,
    pub engine: RuleEngine,
    pub router: DepositRouter<S>,
    pub monitor: MaturityMonitor,
    pub loans: LoanEligibilityEngine,
}

impl AppContext<SqliteStore> {
    /// Open the SQLite-backed context under `data_path`.
    pub async fn open(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;
        let engine = RuleEngine::new(PlanConfig::default());
        let store = Arc::new(SqliteStore::new(data_path.join("kolo.db"), engine.clone()).await?);
        Ok(Self::new(store, engine, LoanConfig::default()))
    }
}

impl<S: LedgerStore + PlanCredit> AppContext<S> {
    pub fn new(store: Arc<S>, engine: RuleEngine, loan_config: LoanConfig) -> Self {
        Self {
            router: DepositRouter::new(store.clone(), engine.clone()),
            monitor: MaturityMonitor::new(engine.clone()),
            loans: LoanEligibilityEngine::new(loan_config),
            engine,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Join a plan; the subscription starts active unless the archetype
    /// waits for its season.
    pub async fn join_plan(
        &self,
        user: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PlanSubscription, anyhow::Error> {
        let plan = self.store.get_plan(plan_id).await?;
        let sub = PlanSubscription::join(user, &plan, now)?;
        self.store.insert_subscription(sub.clone()).await?;
        tracing::info!(user = %user, plan = %plan.name, subscription = %sub.id, "joined plan");
        Ok(sub)
    }

    /// Operator approval of a pending external deposit.
    pub async fn approve_deposit(&self, entry: Uuid) -> Result<(), StoreError> {
        self.store.set_entry_status(entry, EntryStatus::Completed).await
    }

    pub async fn wallet_balance(&self, user: Uuid) -> Result<Decimal, StoreError> {
        let entries = self.store.entries_for_owner(user).await?;
        Ok(wallet_balance(&entries, user))
    }

    /// List a user's subscriptions, running the maturity sweep first and
    /// persisting everything it changed.
    ///
    /// The sweep mutates more than the status: weekly settlement accrues
    /// arrears and the circle season clock advances, so any difference
    /// from the stored snapshot must be written back.
    pub async fn subscriptions(
        &self,
        user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Vec<(PlanSubscription, Plan)>, Vec<StatusChange>), anyhow::Error> {
        let subs = self.store.subscriptions_for_user(user).await?;
        let mut out = Vec::with_capacity(subs.len());
        let mut changes = Vec::new();
        for mut sub in subs {
            let plan = self.store.get_plan(sub.plan_id).await?;
            let snapshot = sub.clone();
            let change = self.monitor.check(&mut sub, &plan, now)?;
            if sub != snapshot {
                self.store.save_subscription(&sub).await?;
            }
            if let Some(change) = change {
                changes.push(change);
            }
            out.push((sub, plan));
        }
        Ok((out, changes))
    }

    /// Break a plan early: cancel the subscription, refund the balance net
    /// of the penalty to the wallet, and record both movements.
    pub async fn break_plan(
        &self,
        user: Uuid,
        subscription: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BreakSettlement, anyhow::Error> {
        let mut sub = self.store.get_subscription(subscription).await?;
        let plan = self.store.get_plan(sub.plan_id).await?;
        let outcome = break_plan(&mut sub, &plan, self.engine.config())?;

        let refund = LedgerEntryBuilder::new()
            .owner(user)
            .kind(EntryKind::TransferIn)
            .amount(Amount::new_unchecked(outcome.refund))
            .description(format!("refund from broken plan '{}'", plan.name))
            .created_at(now)
            .build()?;
        let refund_entry = self.store.append_entry(refund).await?;

        let penalty_entry = if outcome.penalty > Decimal::ZERO {
            let penalty = LedgerEntryBuilder::new()
                .owner(user)
                .scope(subscription)
                .kind(EntryKind::ServiceCharge)
                .amount(Amount::new_unchecked(outcome.penalty))
                .description("early break penalty")
                .created_at(now)
                .build()?;
            Some(self.store.append_entry(penalty).await?)
        } else {
            None
        };

        self.store.save_subscription(&sub).await?;
        Ok(BreakSettlement {
            outcome,
            refund_entry,
            penalty_entry,
        })
    }

    /// Assemble a borrower profile from the ledger and loan book. Account
    /// age and id verification come from the identity system, outside this
    /// crate.
    pub async fn borrower_profile(
        &self,
        user: Uuid,
        account_age_months: u32,
        id_verification: IdVerification,
    ) -> Result<BorrowerProfile, anyhow::Error> {
        let wallet = self.wallet_balance(user).await?;
        let subs = self.store.subscriptions_for_user(user).await?;
        let active = subs
            .iter()
            .filter(|s| s.status == kolo_plans::SubscriptionStatus::Active)
            .count() as u32;
        let loans = self.store.loans_for_user(user).await?;
        Ok(BorrowerProfile {
            user_id: user,
            wallet_balance: wallet,
            account_age_months,
            id_verification,
            active_subscriptions: active,
            loans,
        })
    }

    pub async fn assess_loan(
        &self,
        user: Uuid,
        account_age_months: u32,
        id_verification: IdVerification,
    ) -> Result<LoanAssessment, anyhow::Error> {
        let profile = self
            .borrower_profile(user, account_age_months, id_verification)
            .await?;
        Ok(self.loans.assess(&profile))
    }

    /// Request a loan: on acceptance the principal is disbursed into the
    /// wallet immediately; an over-available request is flagged for review
    /// but still disbursed.
    pub async fn request_loan(
        &self,
        user: Uuid,
        principal: Decimal,
        rate_pct: Decimal,
        duration_months: u32,
        account_age_months: u32,
        id_verification: IdVerification,
        now: DateTime<Utc>,
    ) -> Result<(Loan, bool), anyhow::Error> {
        let profile = self
            .borrower_profile(user, account_age_months, id_verification)
            .await?;
        let outcome = self
            .loans
            .request(&profile, principal, rate_pct, duration_months)?;
        let mut loan = outcome.loan;

        let disbursement = LedgerEntryBuilder::new()
            .owner(user)
            .kind(EntryKind::LoanDisbursement)
            .amount(Amount::new_unchecked(principal))
            .description(format!("loan {} disbursement", loan.loan_number))
            .loan(loan.id)
            .created_at(now)
            .build()?;
        let entry = self.store.append_entry(disbursement).await?;
        loan.activate(entry);
        self.store.insert_loan(loan.clone()).await?;

        tracing::info!(user = %user, loan = %loan.loan_number, %principal, review = outcome.requires_review, "loan disbursed");
        Ok((loan, outcome.requires_review))
    }

    /// Repay against a loan from the wallet. Returns the loan and the
    /// remaining payable.
    pub async fn repay_loan(
        &self,
        user: Uuid,
        loan_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Loan, Decimal), anyhow::Error> {
        let mut loan = self
            .store
            .loans_for_user(user)
            .await?
            .into_iter()
            .find(|l| l.id == loan_id)
            .ok_or(StoreError::LoanNotFound(loan_id))?;

        // Repayments come out of the wallet; the projection must cover
        // the amount before anything is written.
        let available = self.wallet_balance(user).await?;
        if available < amount {
            anyhow::bail!(
                "insufficient wallet balance for repayment: {available} available, {amount} requested"
            );
        }
        let remaining = loan.repay(amount)?;

        let repayment = LedgerEntryBuilder::new()
            .owner(user)
            .kind(EntryKind::LoanRepayment)
            .amount(Amount::new_unchecked(amount))
            .description(format!("loan {} repayment", loan.loan_number))
            .loan(loan.id)
            .created_at(now)
            .build()?;
        self.store.append_entry(repayment).await?;
        self.store.save_loan(&loan).await?;
        Ok((loan, remaining))
    }
}
