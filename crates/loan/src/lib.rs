//! Kolo Loans - borrowing against accumulated savings
//!
//! Eligibility, maximum and available limits, and the duration tier all
//! derive from the ledger-projected wallet balance, account age and loan
//! history. Interest is flat (non-amortizing).

pub mod engine;
pub mod error;
pub mod loan;

pub use engine::{BorrowerProfile, IdVerification, LoanAssessment, LoanConfig, LoanEligibilityEngine, LoanRequestOutcome};
pub use error::LoanError;
pub use loan::{Loan, LoanStatus};
