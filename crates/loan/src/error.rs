//! Loan errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from loan requests and repayments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("Borrower is not eligible: {reason}")]
    NotEligible { reason: &'static str },

    #[error("Requested duration {requested} months exceeds the allowed tier of {max} months")]
    DurationExceedsTier { requested: u32, max: u32 },

    #[error("Principal must be positive, got {0}")]
    NonPositivePrincipal(Decimal),

    #[error("Repayment must be positive, got {0}")]
    NonPositiveRepayment(Decimal),

    #[error("Loan is {status} and cannot accept repayments")]
    NotRepayable { status: crate::loan::LoanStatus },
}
