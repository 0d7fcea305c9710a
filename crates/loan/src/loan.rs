//! Loan record - flat-interest, non-amortizing

use crate::error::LoanError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Active,
    Paid,
    Defaulted,
    Rejected,
}

/// A single loan. `total_payable` is the only field that mutates after
/// disbursement; repayments walk it down to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub principal: Decimal,
    /// Flat interest rate in percent
    pub interest_rate_pct: Decimal,
    pub total_payable: Decimal,
    pub duration_months: u32,
    pub status: LoanStatus,
    pub loan_number: String,
    pub disbursement_entry: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Flat total payable: `principal * (1 + rate/100)`.
    pub fn total_payable_for(principal: Decimal, rate_pct: Decimal) -> Decimal {
        principal * (Decimal::ONE + rate_pct / Decimal::ONE_HUNDRED)
    }

    pub fn new(
        user_id: Uuid,
        principal: Decimal,
        interest_rate_pct: Decimal,
        duration_months: u32,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            user_id,
            principal,
            interest_rate_pct,
            total_payable: Self::total_payable_for(principal, interest_rate_pct),
            duration_months,
            status: LoanStatus::Pending,
            loan_number: format!("KLN-{}", &id.simple().to_string()[..8]),
            disbursement_entry: None,
            created_at: Utc::now(),
        }
    }

    /// Mark the loan disbursed, linking the ledger entry that moved the
    /// money.
    pub fn activate(&mut self, disbursement_entry: Uuid) {
        self.status = LoanStatus::Active;
        self.disbursement_entry = Some(disbursement_entry);
    }

    /// Apply a repayment. Reaching zero (or below) settles the loan.
    /// Returns the remaining payable.
    pub fn repay(&mut self, amount: Decimal) -> Result<Decimal, LoanError> {
        if amount <= Decimal::ZERO {
            return Err(LoanError::NonPositiveRepayment(amount));
        }
        if !matches!(self.status, LoanStatus::Active | LoanStatus::Defaulted) {
            return Err(LoanError::NotRepayable { status: self.status });
        }
        self.total_payable -= amount;
        if self.total_payable <= Decimal::ZERO {
            self.total_payable = Decimal::ZERO;
            self.status = LoanStatus::Paid;
        }
        Ok(self.total_payable)
    }

    /// Debt that still counts against the borrower's available limit.
    pub fn is_outstanding(&self) -> bool {
        matches!(self.status, LoanStatus::Active | LoanStatus::Defaulted)
    }

    /// Loans that count toward the borrower's history tier.
    pub fn counts_toward_history(&self) -> bool {
        matches!(self.status, LoanStatus::Paid | LoanStatus::Active)
    }
}
