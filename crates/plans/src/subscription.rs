//! Plan subscriptions and their archetype-specific cycle metadata
//!
//! The metadata is a tagged variant, validated against the owning plan's
//! archetype wherever a subscription is loaded. A mismatch is a
//! data-integrity bug (`PlanError::ArchetypeMismatch`), never papered over
//! with zero defaults.

use crate::archetype::PlanArchetype;
use crate::error::PlanError;
use crate::plan::{ContributionMode, Plan};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Subscription lifecycle. Advances forward only; the explicit
/// cancel/break transition is the single exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    PendingActivation,
    Active,
    Matured,
    Completed,
    Cancelled,
}

impl SubscriptionStatus {
    fn rank(&self) -> u8 {
        match self {
            SubscriptionStatus::PendingActivation => 0,
            SubscriptionStatus::Active => 1,
            SubscriptionStatus::Matured => 2,
            SubscriptionStatus::Completed => 3,
            SubscriptionStatus::Cancelled => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Completed | SubscriptionStatus::Cancelled)
    }
}

/// Duration selection for daily plans: a day count, or continuous
/// (never matures by count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationChoice {
    Days(u32),
    Continuous,
}

/// Archetype-specific progress state attached to a subscription.
///
/// The serialized tag is the archetype group the variant belongs to; the
/// three weekly-goal archetypes share the `GoalWeekly` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum CycleMetadata {
    Standard,
    GoalWeekly {
        weeks_completed: u32,
        current_week_total: Decimal,
        arrears_amount: Decimal,
        last_settlement_date: DateTime<Utc>,
    },
    MonthlyGoal {
        months_completed: u32,
        month_paid_so_far: Decimal,
        target_amount: Decimal,
        selected_duration: u32,
        arrears_amount: Decimal,
    },
    FixedWeekly {
        selected_duration: u32,
        weeks_completed: u32,
        week_paid_so_far: Decimal,
        fixed_amount: Decimal,
        arrears_amount: Decimal,
    },
    FixedDaily {
        fixed_amount: Decimal,
        selected_duration: DurationChoice,
        total_days_paid: u32,
        last_payment_date: Option<DateTime<Utc>>,
        withdrawn: bool,
        withdrawn_amount: Decimal,
    },
    Circle {
        fixed_amount: Decimal,
        /// Season weeks at which this member receives the pooled payout
        picking_turns: Vec<u32>,
        current_week: u32,
        week_paid: bool,
        missed_weeks: u32,
    },
}

impl CycleMetadata {
    /// Variant name used in mismatch diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            CycleMetadata::Standard => "standard",
            CycleMetadata::GoalWeekly { .. } => "goal_weekly",
            CycleMetadata::MonthlyGoal { .. } => "monthly_goal",
            CycleMetadata::FixedWeekly { .. } => "fixed_weekly",
            CycleMetadata::FixedDaily { .. } => "fixed_daily",
            CycleMetadata::Circle { .. } => "circle",
        }
    }

    /// Whether this variant is the right shape for the archetype.
    pub fn matches(&self, archetype: PlanArchetype) -> bool {
        match self {
            CycleMetadata::Standard => archetype == PlanArchetype::Standard,
            CycleMetadata::GoalWeekly { .. } => archetype.is_goal_weekly(),
            CycleMetadata::MonthlyGoal { .. } => archetype == PlanArchetype::MonthlyGoal,
            CycleMetadata::FixedWeekly { .. } => archetype == PlanArchetype::FixedWeekly,
            CycleMetadata::FixedDaily { .. } => archetype == PlanArchetype::FixedDaily,
            CycleMetadata::Circle { .. } => archetype == PlanArchetype::Circle,
        }
    }

    /// Boundary check when a subscription is loaded next to its plan.
    pub fn ensure_matches(&self, plan: &Plan) -> Result<(), PlanError> {
        if self.matches(plan.archetype) {
            Ok(())
        } else {
            Err(PlanError::ArchetypeMismatch {
                plan: plan.id,
                expected: plan.archetype,
                found: self.variant_name(),
            })
        }
    }

    /// Fresh metadata for a new subscription to `plan`.
    pub fn initial(plan: &Plan, now: DateTime<Utc>) -> Self {
        match plan.archetype {
            PlanArchetype::Standard => CycleMetadata::Standard,
            PlanArchetype::GoalWeeklyStrict
            | PlanArchetype::GoalWeeklyRolling
            | PlanArchetype::GoalWeeklyLocked => CycleMetadata::GoalWeekly {
                weeks_completed: 0,
                current_week_total: Decimal::ZERO,
                arrears_amount: Decimal::ZERO,
                last_settlement_date: now,
            },
            PlanArchetype::MonthlyGoal => CycleMetadata::MonthlyGoal {
                months_completed: 0,
                month_paid_so_far: Decimal::ZERO,
                target_amount: plan.fixed_amount.value(),
                selected_duration: plan.duration,
                arrears_amount: Decimal::ZERO,
            },
            PlanArchetype::FixedWeekly => CycleMetadata::FixedWeekly {
                selected_duration: plan.duration,
                weeks_completed: 0,
                week_paid_so_far: Decimal::ZERO,
                fixed_amount: plan.fixed_amount.value(),
                arrears_amount: Decimal::ZERO,
            },
            PlanArchetype::FixedDaily => CycleMetadata::FixedDaily {
                fixed_amount: plan.fixed_amount.value(),
                selected_duration: if plan.duration == 0 {
                    DurationChoice::Continuous
                } else {
                    DurationChoice::Days(plan.duration)
                },
                total_days_paid: 0,
                last_payment_date: None,
                withdrawn: false,
                withdrawn_amount: Decimal::ZERO,
            },
            PlanArchetype::Circle => CycleMetadata::Circle {
                fixed_amount: plan.fixed_amount.value(),
                picking_turns: Vec::new(),
                current_week: 1,
                week_paid: false,
                missed_weeks: 0,
            },
        }
    }
}

/// One user's subscription to one plan.
///
/// `balance` is a cache: it must always be reconstructible from the ledger
/// entries scoped to this subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub balance: Decimal,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub metadata: CycleMetadata,
}

impl PlanSubscription {
    /// Join a plan. Circles start pending until the season opens; every
    /// other archetype is active immediately.
    pub fn join(user_id: Uuid, plan: &Plan, now: DateTime<Utc>) -> Result<Self, PlanError> {
        if !plan.active {
            return Err(PlanError::InactivePlan(plan.id));
        }
        if plan.mode == ContributionMode::Fixed && plan.fixed_amount.is_zero() {
            return Err(PlanError::MissingFixedAmount);
        }
        let status = if plan.archetype.joins_pending() {
            SubscriptionStatus::PendingActivation
        } else {
            SubscriptionStatus::Active
        };
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan.id,
            balance: Decimal::ZERO,
            status,
            started_at: now,
            metadata: CycleMetadata::initial(plan, now),
        })
    }

    /// Forward-only status advance. Cancellation goes through
    /// `breakout::break_plan`, not here.
    pub fn advance_status(&mut self, to: SubscriptionStatus) -> Result<(), PlanError> {
        if to == SubscriptionStatus::Cancelled || to.rank() <= self.status.rank() {
            return Err(PlanError::BackwardStatus {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Record that matured funds were withdrawn (daily plans track the
    /// amount for the fresh-cycle reset).
    pub fn mark_withdrawn(&mut self, amount: Decimal) {
        if let CycleMetadata::FixedDaily {
            withdrawn,
            withdrawn_amount,
            ..
        } = &mut self.metadata
        {
            *withdrawn = true;
            *withdrawn_amount += amount;
        }
        self.balance -= amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ContributionMode;
    use kolo_core::Amount;
    use rust_decimal_macros::dec;

    fn plan(archetype: PlanArchetype) -> Plan {
        Plan::new("p", archetype, ContributionMode::Fixed)
            .with_fixed_amount(Amount::from_major(1000))
            .with_duration(12)
    }

    #[test]
    fn test_initial_metadata_matches_archetype() {
        let now = Utc::now();
        for archetype in [
            PlanArchetype::Standard,
            PlanArchetype::GoalWeeklyStrict,
            PlanArchetype::GoalWeeklyRolling,
            PlanArchetype::GoalWeeklyLocked,
            PlanArchetype::MonthlyGoal,
            PlanArchetype::FixedWeekly,
            PlanArchetype::FixedDaily,
            PlanArchetype::Circle,
        ] {
            let p = plan(archetype);
            let meta = CycleMetadata::initial(&p, now);
            assert!(meta.matches(archetype), "mismatch for {archetype}");
        }
    }

    #[test]
    fn test_mismatch_rejected_on_load() {
        let p = plan(PlanArchetype::Circle);
        let meta = CycleMetadata::Standard;
        let err = meta.ensure_matches(&p).unwrap_err();
        assert!(matches!(err, PlanError::ArchetypeMismatch { expected: PlanArchetype::Circle, .. }));
    }

    #[test]
    fn test_join_inactive_plan_rejected() {
        let mut p = plan(PlanArchetype::Standard);
        p.archive();
        let err = PlanSubscription::join(Uuid::new_v4(), &p, Utc::now()).unwrap_err();
        assert!(matches!(err, PlanError::InactivePlan(_)));
    }

    #[test]
    fn test_join_fixed_plan_without_amount_rejected() {
        let p = Plan::new("fw", PlanArchetype::FixedWeekly, ContributionMode::Fixed);
        let err = PlanSubscription::join(Uuid::new_v4(), &p, Utc::now()).unwrap_err();
        assert!(matches!(err, PlanError::MissingFixedAmount));
    }

    #[test]
    fn test_circle_joins_pending() {
        let p = plan(PlanArchetype::Circle);
        let sub = PlanSubscription::join(Uuid::new_v4(), &p, Utc::now()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::PendingActivation);

        let p2 = plan(PlanArchetype::MonthlyGoal);
        let sub2 = PlanSubscription::join(Uuid::new_v4(), &p2, Utc::now()).unwrap();
        assert_eq!(sub2.status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_status_forward_only() {
        let p = plan(PlanArchetype::FixedWeekly);
        let mut sub = PlanSubscription::join(Uuid::new_v4(), &p, Utc::now()).unwrap();
        sub.advance_status(SubscriptionStatus::Matured).unwrap();
        let err = sub.advance_status(SubscriptionStatus::Active).unwrap_err();
        assert!(matches!(err, PlanError::BackwardStatus { .. }));
        // Cancel never goes through advance_status.
        assert!(sub.advance_status(SubscriptionStatus::Cancelled).is_err());
    }

    #[test]
    fn test_mark_withdrawn_tracks_daily_reset() {
        let p = plan(PlanArchetype::FixedDaily);
        let mut sub = PlanSubscription::join(Uuid::new_v4(), &p, Utc::now()).unwrap();
        sub.balance = dec!(31000);
        sub.mark_withdrawn(dec!(31000));
        assert_eq!(sub.balance, dec!(0));
        match sub.metadata {
            CycleMetadata::FixedDaily { withdrawn, withdrawn_amount, .. } => {
                assert!(withdrawn);
                assert_eq!(withdrawn_amount, dec!(31000));
            }
            _ => panic!("wrong metadata"),
        }
    }

    #[test]
    fn test_metadata_serde_tagged() {
        let meta = CycleMetadata::MonthlyGoal {
            months_completed: 2,
            month_paid_so_far: dec!(8000),
            target_amount: dec!(20000),
            selected_duration: 6,
            arrears_amount: dec!(0),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"variant\":\"monthly_goal\""));
        let back: CycleMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}
