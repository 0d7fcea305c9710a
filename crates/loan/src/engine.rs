//! Loan eligibility engine - limits and duration tiers from the ledger
//!
//! Everything derives from a borrower snapshot: the wallet balance is the
//! ledger projection, never a stored figure.

use crate::error::LoanError;
use crate::loan::Loan;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Government-id verification state of the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdVerification {
    Unverified,
    PendingReview,
    Verified,
}

/// Configuration for the eligibility engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanConfig {
    /// Balance fraction lent to accounts at least `senior_age_months` old
    #[serde(default = "default_senior_pct")]
    pub senior_pct: Decimal,

    /// Balance fraction lent to younger accounts
    #[serde(default = "default_junior_pct")]
    pub junior_pct: Decimal,

    /// Account age (months) at which the senior fraction applies
    #[serde(default = "default_senior_age_months")]
    pub senior_age_months: u32,
}

fn default_senior_pct() -> Decimal {
    Decimal::new(70, 2) // 0.70
}

fn default_junior_pct() -> Decimal {
    Decimal::new(50, 2) // 0.50
}

fn default_senior_age_months() -> u32 {
    12
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            senior_pct: default_senior_pct(),
            junior_pct: default_junior_pct(),
            senior_age_months: default_senior_age_months(),
        }
    }
}

/// Snapshot of a borrower at assessment time
#[derive(Debug, Clone)]
pub struct BorrowerProfile {
    pub user_id: Uuid,
    /// Ledger-derived general wallet balance
    pub wallet_balance: Decimal,
    pub account_age_months: u32,
    pub id_verification: IdVerification,
    pub active_subscriptions: u32,
    pub loans: Vec<Loan>,
}

impl BorrowerProfile {
    fn outstanding_debt(&self) -> Decimal {
        self.loans
            .iter()
            .filter(|l| l.is_outstanding())
            .map(|l| l.total_payable)
            .sum()
    }

    fn history_count(&self) -> usize {
        self.loans.iter().filter(|l| l.counts_toward_history()).count()
    }
}

/// What the borrower can get right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanAssessment {
    pub eligible: bool,
    pub maximum: Decimal,
    pub available: Decimal,
    pub max_duration_months: u32,
}

/// Accepted request plus whether it needs administrator review
#[derive(Debug, Clone)]
pub struct LoanRequestOutcome {
    pub loan: Loan,
    pub requires_review: bool,
}

/// Computes borrowing eligibility, limits and duration tier.
#[derive(Debug, Clone, Default)]
pub struct LoanEligibilityEngine {
    config: LoanConfig,
}

impl LoanEligibilityEngine {
    pub fn new(config: LoanConfig) -> Self {
        Self { config }
    }

    /// Assess a borrower snapshot.
    pub fn assess(&self, profile: &BorrowerProfile) -> LoanAssessment {
        let eligible = profile.active_subscriptions > 0
            && profile.id_verification == IdVerification::Verified;

        let pct = if profile.account_age_months >= self.config.senior_age_months {
            self.config.senior_pct
        } else {
            self.config.junior_pct
        };
        let maximum = profile.wallet_balance * pct;
        let available = (maximum - profile.outstanding_debt()).max(Decimal::ZERO);

        let max_duration_months = match profile.history_count() {
            0..=1 => 1,
            2..=4 => 3,
            _ => 6,
        };

        LoanAssessment {
            eligible,
            maximum,
            available,
            max_duration_months,
        }
    }

    /// Handle a loan request. Ineligibility and an over-tier duration are
    /// hard rejections; a principal above the available limit is accepted
    /// but flagged for administrator review instead of auto-approval.
    pub fn request(
        &self,
        profile: &BorrowerProfile,
        principal: Decimal,
        interest_rate_pct: Decimal,
        duration_months: u32,
    ) -> Result<LoanRequestOutcome, LoanError> {
        if principal <= Decimal::ZERO {
            return Err(LoanError::NonPositivePrincipal(principal));
        }
        let assessment = self.assess(profile);
        if !assessment.eligible {
            let reason = if profile.active_subscriptions == 0 {
                "no active plan subscription"
            } else {
                "government id not verified"
            };
            return Err(LoanError::NotEligible { reason });
        }
        if duration_months > assessment.max_duration_months {
            return Err(LoanError::DurationExceedsTier {
                requested: duration_months,
                max: assessment.max_duration_months,
            });
        }

        let requires_review = principal > assessment.available;
        if requires_review {
            tracing::warn!(
                user = %profile.user_id,
                %principal,
                available = %assessment.available,
                "loan request above available limit, flagged for review"
            );
        }
        let loan = Loan::new(profile.user_id, principal, interest_rate_pct, duration_months);
        Ok(LoanRequestOutcome { loan, requires_review })
    }
}
