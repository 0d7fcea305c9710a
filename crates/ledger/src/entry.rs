//! Ledger entries - immutable money-movement events
//!
//! An entry is created once and never edited, with one exception: the
//! single status transition pending -> {completed, failed}.

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use kolo_core::Amount;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Classification of a money movement.
///
/// Credit kinds increase the owning scope's balance, debit kinds decrease
/// it. The direction lives here, never in the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
    ServiceCharge,
    LoanDisbursement,
    LoanRepayment,
}

impl EntryKind {
    /// True for kinds that add funds to their scope.
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            EntryKind::Deposit | EntryKind::TransferIn | EntryKind::LoanDisbursement
        )
    }

    /// True for kinds that remove funds from their scope.
    pub fn is_debit(&self) -> bool {
        !self.is_credit()
    }
}

/// Entry lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
}

/// One money-movement event.
///
/// `scope = None` means the owner's general wallet; `Some(id)` ties the
/// entry to a plan subscription. Amount and fee are non-negative by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub owner: Uuid,
    /// None = general wallet, Some = plan subscription id
    pub scope: Option<Uuid>,
    pub kind: EntryKind,
    pub amount: Amount,
    pub fee: Amount,
    pub status: EntryStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub loan_id: Option<Uuid>,
    pub receipt_url: Option<String>,
}

impl LedgerEntry {
    /// Apply the single permitted mutation: pending -> {completed, failed}.
    pub fn transition(&mut self, to: EntryStatus) -> Result<(), LedgerError> {
        match (self.status, to) {
            (EntryStatus::Pending, EntryStatus::Completed)
            | (EntryStatus::Pending, EntryStatus::Failed) => {
                self.status = to;
                Ok(())
            }
            (from, to) => Err(LedgerError::InvalidStatusTransition { from, to }),
        }
    }

    /// True when the entry belongs to the general wallet of `owner`.
    pub fn is_wallet_entry(&self, owner: Uuid) -> bool {
        self.owner == owner && self.scope.is_none()
    }
}

/// Builder for `LedgerEntry`.
///
/// # Example
/// ```
/// use kolo_ledger::{EntryKind, LedgerEntryBuilder};
/// use kolo_core::Amount;
/// use uuid::Uuid;
///
/// let entry = LedgerEntryBuilder::new()
///     .owner(Uuid::new_v4())
///     .kind(EntryKind::Deposit)
///     .amount(Amount::from_major(5000))
///     .description("wallet top-up")
///     .build()
///     .unwrap();
/// assert!(entry.scope.is_none());
/// ```
#[derive(Debug, Default)]
pub struct LedgerEntryBuilder {
    owner: Option<Uuid>,
    scope: Option<Uuid>,
    kind: Option<EntryKind>,
    amount: Option<Amount>,
    fee: Amount,
    status: Option<EntryStatus>,
    description: String,
    created_at: Option<DateTime<Utc>>,
    loan_id: Option<Uuid>,
    receipt_url: Option<String>,
}

impl LedgerEntryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn scope(mut self, subscription: Uuid) -> Self {
        self.scope = Some(subscription);
        self
    }

    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn fee(mut self, fee: Amount) -> Self {
        self.fee = fee;
        self
    }

    pub fn status(mut self, status: EntryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn loan(mut self, loan_id: Uuid) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn receipt(mut self, url: impl Into<String>) -> Self {
        self.receipt_url = Some(url.into());
        self
    }

    /// Build the entry. Status defaults to `Completed`, fee to zero,
    /// `created_at` to now.
    pub fn build(self) -> Result<LedgerEntry, LedgerError> {
        Ok(LedgerEntry {
            id: Uuid::new_v4(),
            owner: self.owner.ok_or(LedgerError::MissingOwner)?,
            scope: self.scope,
            kind: self.kind.ok_or(LedgerError::MissingKind)?,
            amount: self.amount.ok_or(LedgerError::MissingAmount)?,
            fee: self.fee,
            status: self.status.unwrap_or(EntryStatus::Completed),
            description: self.description,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            loan_id: self.loan_id,
            receipt_url: self.receipt_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind, status: EntryStatus) -> LedgerEntry {
        LedgerEntryBuilder::new()
            .owner(Uuid::new_v4())
            .kind(kind)
            .amount(Amount::from_major(1000))
            .status(status)
            .build()
            .unwrap()
    }

    #[test]
    fn test_kind_classification() {
        assert!(EntryKind::Deposit.is_credit());
        assert!(EntryKind::LoanDisbursement.is_credit());
        assert!(EntryKind::TransferIn.is_credit());
        assert!(EntryKind::Withdrawal.is_debit());
        assert!(EntryKind::ServiceCharge.is_debit());
        assert!(EntryKind::LoanRepayment.is_debit());
        assert!(EntryKind::TransferOut.is_debit());
    }

    #[test]
    fn test_pending_to_completed() {
        let mut e = entry(EntryKind::Deposit, EntryStatus::Pending);
        e.transition(EntryStatus::Completed).unwrap();
        assert_eq!(e.status, EntryStatus::Completed);
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut e = entry(EntryKind::Deposit, EntryStatus::Completed);
        let err = e.transition(EntryStatus::Failed).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_builder_requires_owner() {
        let err = LedgerEntryBuilder::new()
            .kind(EntryKind::Deposit)
            .amount(Amount::from_major(10))
            .build()
            .unwrap_err();
        assert_eq!(err, LedgerError::MissingOwner);
    }

    #[test]
    fn test_status_string_form() {
        assert_eq!(EntryStatus::Pending.to_string(), "pending");
        assert_eq!(EntryKind::LoanDisbursement.to_string(), "loan_disbursement");
        assert_eq!("service_charge".parse::<EntryKind>().unwrap(), EntryKind::ServiceCharge);
    }
}
