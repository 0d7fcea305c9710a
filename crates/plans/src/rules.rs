//! Rule engine - the per-period decision for every archetype
//!
//! Stateless: every evaluation takes an explicit snapshot (subscription
//! metadata, plan, now) and returns a value. No ambient state.

use crate::archetype::PlanArchetype;
use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::plan::{ContributionMode, Plan};
use crate::subscription::{CycleMetadata, DurationChoice, PlanSubscription};
use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Outcome of evaluating one subscription at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVerdict {
    /// Minimum/exact contribution required for the current period
    /// (zero = free amount)
    pub mandated_amount: Decimal,
    /// Whether manual amount entry is locked to the mandated amount
    pub input_locked: bool,
    /// Fee that applies to the mandated contribution
    pub fee: Decimal,
    /// Period amount used for advance-payment coverage, when defined
    pub period_amount: Option<Decimal>,
    /// Whether the duration/target condition is satisfied
    pub matured: bool,
}

impl RuleVerdict {
    /// How many future periods a lump sum covers. Advisory for user
    /// feedback only - never bypasses validation.
    pub fn periods_covered(&self, requested: Decimal) -> u32 {
        match self.period_amount {
            Some(period) if period > Decimal::ZERO => {
                (requested / period).floor().to_u32().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// Stateless decision engine over plan subscriptions.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: PlanConfig,
}

impl RuleEngine {
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Evaluate a subscription snapshot. Rejects with `ArchetypeMismatch`
    /// before reading any field of a wrong-shaped metadata variant.
    pub fn evaluate(
        &self,
        sub: &PlanSubscription,
        plan: &Plan,
        now: DateTime<Utc>,
    ) -> Result<RuleVerdict, PlanError> {
        sub.metadata.ensure_matches(plan)?;

        let mandated = self.mandated_amount(&sub.metadata, plan);
        let input_locked = self.input_locked(sub, plan, mandated, now);
        let fee = self.contribution_fee(plan, mandated);
        let period_amount = self.period_amount(&sub.metadata, plan);
        let matured = self.is_matured(sub, plan)?;

        Ok(RuleVerdict {
            mandated_amount: mandated,
            input_locked,
            fee,
            period_amount,
            matured,
        })
    }

    /// Fee for an arbitrary contribution amount. Only circles charge a
    /// per-contribution fee; all other archetypes return zero.
    pub fn contribution_fee(&self, plan: &Plan, amount: Decimal) -> Decimal {
        match plan.archetype {
            PlanArchetype::Circle => self.config.circle_fee(amount),
            _ => Decimal::ZERO,
        }
    }

    fn mandated_amount(&self, metadata: &CycleMetadata, plan: &Plan) -> Decimal {
        match metadata {
            CycleMetadata::MonthlyGoal {
                target_amount,
                month_paid_so_far,
                ..
            } => (*target_amount - *month_paid_so_far).max(Decimal::ZERO),
            CycleMetadata::GoalWeekly {
                current_week_total, ..
            } => (self.config.weekly_floor - *current_week_total).max(Decimal::ZERO),
            CycleMetadata::Circle { fixed_amount, .. } => *fixed_amount,
            CycleMetadata::FixedWeekly { fixed_amount, .. }
            | CycleMetadata::FixedDaily { fixed_amount, .. }
                if plan.mode == ContributionMode::Fixed =>
            {
                *fixed_amount
            }
            _ => Decimal::ZERO,
        }
    }

    fn input_locked(
        &self,
        sub: &PlanSubscription,
        plan: &Plan,
        mandated: Decimal,
        now: DateTime<Utc>,
    ) -> bool {
        if mandated.is_zero() {
            return false;
        }
        match plan.archetype {
            // Explicitly exempt: the user may always enter >= target.
            PlanArchetype::MonthlyGoal => false,
            // Unlocks once one duration window or one calendar month has
            // elapsed since the start date, whichever comes first.
            PlanArchetype::FixedDaily => !fixed_daily_window_elapsed(sub, now),
            PlanArchetype::Standard => false,
            _ => true,
        }
    }

    fn period_amount(&self, metadata: &CycleMetadata, _plan: &Plan) -> Option<Decimal> {
        match metadata {
            CycleMetadata::GoalWeekly { .. } => Some(self.config.weekly_floor),
            CycleMetadata::MonthlyGoal { target_amount, .. } => Some(*target_amount),
            CycleMetadata::FixedDaily { fixed_amount, .. } => Some(*fixed_amount),
            _ => None,
        }
    }

    fn is_matured(&self, sub: &PlanSubscription, plan: &Plan) -> Result<bool, PlanError> {
        let matured = match &sub.metadata {
            CycleMetadata::Standard => false,
            CycleMetadata::GoalWeekly {
                weeks_completed, ..
            } => match plan.archetype {
                PlanArchetype::GoalWeeklyStrict => {
                    *weeks_completed >= self.config.strict_duration_weeks
                }
                PlanArchetype::GoalWeeklyLocked => {
                    *weeks_completed >= self.config.locked_duration_weeks
                }
                // Rolling never matures by count.
                _ => false,
            },
            CycleMetadata::MonthlyGoal {
                months_completed,
                selected_duration,
                ..
            } => *months_completed >= *selected_duration,
            CycleMetadata::FixedWeekly {
                weeks_completed,
                selected_duration,
                ..
            } => *weeks_completed >= *selected_duration,
            CycleMetadata::FixedDaily {
                fixed_amount,
                selected_duration,
                total_days_paid,
                ..
            } => match selected_duration {
                DurationChoice::Continuous => false,
                DurationChoice::Days(days) => {
                    effective_days_paid(*total_days_paid, sub.balance, *fixed_amount) >= *days
                }
            },
            CycleMetadata::Circle { current_week, .. } => {
                *current_week > self.config.circle_season_weeks
            }
        };
        Ok(matured)
    }
}

/// Days paid, taking the larger of the stored counter and what the balance
/// itself proves was paid.
fn effective_days_paid(stored: u32, balance: Decimal, fixed_amount: Decimal) -> u32 {
    if fixed_amount <= Decimal::ZERO {
        return stored;
    }
    let derived = (balance / fixed_amount).floor().to_u32().unwrap_or(0);
    stored.max(derived)
}

/// FixedDaily amount entry unlocks once either one full duration window or
/// one calendar month has elapsed from the start date.
fn fixed_daily_window_elapsed(sub: &PlanSubscription, now: DateTime<Utc>) -> bool {
    let one_month = sub
        .started_at
        .checked_add_months(Months::new(1))
        .map(|m| now >= m)
        .unwrap_or(false);
    let window = match &sub.metadata {
        CycleMetadata::FixedDaily {
            selected_duration: DurationChoice::Days(days),
            ..
        } => now >= sub.started_at + Duration::days(i64::from(*days)),
        _ => false,
    };
    one_month || window
}
