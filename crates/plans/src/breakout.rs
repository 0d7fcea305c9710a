//! Break (early cancel) - flat-penalty early exit for cancellable plans

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::plan::Plan;
use crate::subscription::{PlanSubscription, SubscriptionStatus};
use rust_decimal::Decimal;

/// Money split of a break: `refund` goes to the general wallet, `penalty`
/// is recorded as a service-charge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakOutcome {
    pub refund: Decimal,
    pub penalty: Decimal,
}

/// Break a plan early: charge the flat penalty on the current balance,
/// zero the balance and cancel the subscription.
///
/// Strict-discipline archetypes (discipline-locked weekly, circle) reject
/// the operation outright - a validation error, never a silent no-op.
pub fn break_plan(
    sub: &mut PlanSubscription,
    plan: &Plan,
    config: &PlanConfig,
) -> Result<BreakOutcome, PlanError> {
    sub.metadata.ensure_matches(plan)?;

    if !plan.archetype.cancellable() {
        return Err(PlanError::BreakNotAllowed(plan.archetype));
    }
    if !matches!(
        sub.status,
        SubscriptionStatus::PendingActivation | SubscriptionStatus::Active
    ) {
        return Err(PlanError::NotActive {
            subscription: sub.id,
            status: sub.status,
        });
    }

    let penalty = sub.balance * config.break_penalty_pct / Decimal::ONE_HUNDRED;
    let refund = sub.balance - penalty;
    sub.balance = Decimal::ZERO;
    sub.status = SubscriptionStatus::Cancelled;
    tracing::info!(subscription = %sub.id, %refund, %penalty, "plan broken");

    Ok(BreakOutcome { refund, penalty })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::PlanArchetype;
    use crate::plan::ContributionMode;
    use crate::subscription::CycleMetadata;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sub_with_balance(plan: &Plan, balance: Decimal) -> PlanSubscription {
        let mut sub = PlanSubscription::join(Uuid::new_v4(), plan, Utc::now()).unwrap();
        sub.balance = balance;
        sub
    }

    #[test]
    fn test_break_charges_five_percent() {
        let plan = Plan::new("w", PlanArchetype::GoalWeeklyStrict, ContributionMode::Flexible);
        let mut sub = sub_with_balance(&plan, dec!(10000));
        let outcome = break_plan(&mut sub, &plan, &PlanConfig::default()).unwrap();
        assert_eq!(outcome.refund, dec!(9500));
        assert_eq!(outcome.penalty, dec!(500));
        assert_eq!(sub.balance, dec!(0));
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn test_break_circle_rejected() {
        let plan = Plan::new("c", PlanArchetype::Circle, ContributionMode::Fixed)
            .with_fixed_amount(kolo_core::Amount::from_major(5000));
        let mut sub = sub_with_balance(&plan, dec!(10000));
        let err = break_plan(&mut sub, &plan, &PlanConfig::default()).unwrap_err();
        assert_eq!(err, PlanError::BreakNotAllowed(PlanArchetype::Circle));
        // Nothing changed.
        assert_eq!(sub.balance, dec!(10000));
    }

    #[test]
    fn test_break_locked_weekly_rejected() {
        let plan = Plan::new("l", PlanArchetype::GoalWeeklyLocked, ContributionMode::Flexible);
        let mut sub = sub_with_balance(&plan, dec!(5000));
        let err = break_plan(&mut sub, &plan, &PlanConfig::default()).unwrap_err();
        assert_eq!(err, PlanError::BreakNotAllowed(PlanArchetype::GoalWeeklyLocked));
    }

    #[test]
    fn test_break_cancelled_twice_rejected() {
        let plan = Plan::new("s", PlanArchetype::Standard, ContributionMode::Flexible);
        let mut sub = sub_with_balance(&plan, dec!(1000));
        break_plan(&mut sub, &plan, &PlanConfig::default()).unwrap();
        let err = break_plan(&mut sub, &plan, &PlanConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::NotActive { .. }));
    }

    #[test]
    fn test_break_mismatched_metadata_fatal() {
        let plan = Plan::new("s", PlanArchetype::Standard, ContributionMode::Flexible);
        let mut sub = sub_with_balance(&plan, dec!(1000));
        sub.metadata = CycleMetadata::Circle {
            fixed_amount: dec!(5000),
            picking_turns: vec![],
            current_week: 1,
            week_paid: false,
            missed_weeks: 0,
        };
        let err = break_plan(&mut sub, &plan, &PlanConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::ArchetypeMismatch { .. }));
    }
}
