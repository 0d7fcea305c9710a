//! Deposit router - the single entry point for contributions
//!
//! Three flows, chosen by channel and archetype:
//! - external funds land as a pending wallet deposit awaiting approval
//! - a wallet transfer into a cyclical plan debits the wallet then runs the
//!   atomic plan credit
//! - a wallet transfer into a standard pot writes two completed entries and
//!   recomputes the cached pot balance from the ledger

use crate::audit::{AuditTrail, ReconciliationQueue, ReconciliationTask};
use crate::error::DepositError;
use chrono::{DateTime, Utc};
use kolo_core::Amount;
use kolo_ledger::{subscription_flat_balance, wallet_balance, EntryKind, EntryStatus, LedgerEntryBuilder};
use kolo_plans::{Plan, PlanArchetype, PlanSubscription, RuleEngine};
use kolo_store::{LedgerStore, PlanCredit, PlanCreditReceipt, PlanCreditRequest};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// How the money arrives.
#[derive(Debug, Clone)]
pub enum DepositChannel {
    /// Funds from outside the system; held pending until an operator
    /// approves the receipt.
    External { receipt_url: String },
    /// Moved out of the caller's own wallet.
    WalletTransfer,
}

#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub user: Uuid,
    /// Target subscription; None = plain wallet top-up
    pub subscription: Option<Uuid>,
    pub amount: Decimal,
    pub channel: DepositChannel,
}

/// What the router did with the money.
#[derive(Debug, Clone)]
pub enum DepositOutcome {
    /// External deposit recorded, awaiting approval
    PendingApproval { entry: Uuid },
    /// Wallet debited and the cyclical plan credited atomically
    PlanCredited {
        debit_entry: Uuid,
        receipt: PlanCreditReceipt,
    },
    /// Wallet debited and the standard pot credited
    PotCredited {
        debit_entry: Uuid,
        credit_entry: Uuid,
        new_balance: Decimal,
    },
}

/// Routes deposits, enforcing the archetype's amount rules before any
/// entry is written.
pub struct DepositRouter<S> {
    store: Arc<S>,
    engine: RuleEngine,
    audit: AuditTrail,
    reconciliation: ReconciliationQueue,
}

impl<S: LedgerStore + PlanCredit> DepositRouter<S> {
    pub fn new(store: Arc<S>, engine: RuleEngine) -> Self {
        Self {
            store,
            engine,
            audit: AuditTrail::default(),
            reconciliation: ReconciliationQueue::default(),
        }
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn reconciliation(&self) -> &ReconciliationQueue {
        &self.reconciliation
    }

    pub async fn deposit(
        &self,
        req: DepositRequest,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome, DepositError> {
        if req.amount <= Decimal::ZERO {
            return Err(DepositError::NonPositiveAmount);
        }

        // Amount validation runs against the target subscription before any
        // entry is written.
        let target = match req.subscription {
            Some(id) => {
                let sub = self.store.get_subscription(id).await?;
                let plan = self.store.get_plan(sub.plan_id).await?;
                self.validate_amount(&sub, &plan, req.amount, now)?;
                Some((sub, plan))
            }
            None => None,
        };

        match &req.channel {
            DepositChannel::External { receipt_url } => {
                let receipt_url = receipt_url.clone();
                self.external(&req, receipt_url, now).await
            }
            DepositChannel::WalletTransfer => {
                let available = wallet_balance(
                    &self.store.entries_for_owner(req.user).await?,
                    req.user,
                );
                if available < req.amount {
                    return Err(DepositError::InsufficientWallet {
                        available,
                        requested: req.amount,
                    });
                }
                let (sub, plan) = target.ok_or(DepositError::MissingSubscription)?;
                self.wallet_transfer(&req, sub, plan, now).await
            }
        }
    }

    /// Effective minimum: the mandated amount when one applies, the plan
    /// minimum otherwise.
    fn validate_amount(
        &self,
        sub: &PlanSubscription,
        plan: &Plan,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), DepositError> {
        let verdict = self.engine.evaluate(sub, plan, now)?;
        if verdict.mandated_amount > Decimal::ZERO {
            if amount < verdict.mandated_amount {
                return Err(DepositError::BelowMandated {
                    mandated: verdict.mandated_amount,
                });
            }
        } else if amount < plan.min_amount.value() {
            return Err(DepositError::BelowMinimum {
                minimum: plan.min_amount.value(),
            });
        }
        Ok(())
    }

    async fn external(
        &self,
        req: &DepositRequest,
        receipt_url: String,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome, DepositError> {
        // The target subscription travels in the description so the
        // approver can route the funds onward after approval.
        let description = match req.subscription {
            Some(sub) => format!("external deposit awaiting approval for subscription {sub}"),
            None => "external deposit awaiting approval".to_string(),
        };
        let entry = LedgerEntryBuilder::new()
            .owner(req.user)
            .kind(EntryKind::Deposit)
            .amount(Amount::new_unchecked(req.amount))
            .status(EntryStatus::Pending)
            .description(description)
            .receipt(receipt_url)
            .created_at(now)
            .build()?;
        let entry_id = self.store.append_entry(entry).await?;

        self.audit.record(
            req.user,
            "deposit.external",
            format!("{} pending entry {}", req.amount, entry_id),
        );
        Ok(DepositOutcome::PendingApproval { entry: entry_id })
    }

    async fn wallet_transfer(
        &self,
        req: &DepositRequest,
        sub: PlanSubscription,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome, DepositError> {
        let debit = LedgerEntryBuilder::new()
            .owner(req.user)
            .kind(EntryKind::TransferOut)
            .amount(Amount::new_unchecked(req.amount))
            .description(format!("transfer to plan '{}'", plan.name))
            .created_at(now)
            .build()?;
        let debit_entry = self.store.append_entry(debit).await?;

        if plan.archetype == PlanArchetype::Standard {
            return self.pot_credit(req, sub, debit_entry, now).await;
        }

        // The debit is committed; a credit failure from here on is a
        // partial failure, not a validation failure.
        match self
            .store
            .apply_plan_credit(PlanCreditRequest {
                user: req.user,
                subscription: sub.id,
                amount: req.amount,
                now,
            })
            .await
        {
            Ok(receipt) => {
                self.audit.record(
                    req.user,
                    "deposit.plan",
                    format!("{} into '{}': {}", req.amount, plan.name, receipt.advance),
                );
                Ok(DepositOutcome::PlanCredited {
                    debit_entry,
                    receipt,
                })
            }
            Err(err) => {
                let reason = err.to_string();
                self.reconciliation.enqueue(ReconciliationTask {
                    debit_entry,
                    subscription: sub.id,
                    amount: req.amount,
                    reason: reason.clone(),
                    at: now,
                });
                Err(DepositError::PlanCreditFailure {
                    debit_entry,
                    reason,
                })
            }
        }
    }

    async fn pot_credit(
        &self,
        req: &DepositRequest,
        mut sub: PlanSubscription,
        debit_entry: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DepositOutcome, DepositError> {
        let credit = LedgerEntryBuilder::new()
            .owner(req.user)
            .scope(sub.id)
            .kind(EntryKind::Deposit)
            .amount(Amount::new_unchecked(req.amount))
            .description("wallet transfer into pot")
            .created_at(now)
            .build()?;
        let credit_entry = self.store.append_entry(credit).await?;

        // The ledger is the source of truth; the stored balance is a cache
        // recomputed from the scope's entries.
        let entries = self.store.entries_for_scope(sub.id).await?;
        sub.balance = subscription_flat_balance(&entries, sub.id);
        let new_balance = sub.balance;
        self.store.save_subscription(&sub).await?;

        self.audit.record(
            req.user,
            "deposit.pot",
            format!("{} into pot {}", req.amount, sub.id),
        );
        Ok(DepositOutcome::PotCredited {
            debit_entry,
            credit_entry,
            new_balance,
        })
    }
}
