//! Credit application - the pure half of the atomic plan-credit operation
//!
//! Stores call `apply_credit` inside their own transaction/lock; this
//! module only computes the next metadata state and the typed description
//! of what cycle unit the contribution satisfied.

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::plan::Plan;
use crate::subscription::CycleMetadata;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

/// What cycle unit a credited contribution satisfied, for caller messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleAdvance {
    /// Standard archetype: money in, no cycle to advance
    WalletStyle,
    WeeksPaid { weeks: u32, weeks_completed: u32 },
    MonthsPaid { months: u32, months_completed: u32 },
    DaysAdvanced { days: u32, total_days_paid: u32 },
    CircleWeekPaid { week: u32, missed_cleared: u32 },
}

impl fmt::Display for CycleAdvance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleAdvance::WalletStyle => write!(f, "credited"),
            CycleAdvance::WeeksPaid { weeks, weeks_completed } => {
                write!(f, "{weeks} week(s) paid, {weeks_completed} completed")
            }
            CycleAdvance::MonthsPaid { months, months_completed } => {
                write!(f, "{months} month(s) paid, {months_completed} completed")
            }
            CycleAdvance::DaysAdvanced { days, total_days_paid } => {
                write!(f, "{days} day(s) advanced, {total_days_paid} total")
            }
            CycleAdvance::CircleWeekPaid { week, missed_cleared } => {
                if *missed_cleared > 0 {
                    write!(f, "week {week} paid, {missed_cleared} missed week(s) cleared")
                } else {
                    write!(f, "week {week} paid")
                }
            }
        }
    }
}

/// Apply a contribution (net of fee) to the cycle metadata.
///
/// Arrears are retired first; the remainder tops up the current period's
/// accumulator and rolls over whole periods for lump sums. Returns the new
/// metadata plus the advance description; the caller persists both together
/// with the ledger entry, atomically.
pub fn apply_credit(
    metadata: &CycleMetadata,
    plan: &Plan,
    amount: Decimal,
    now: DateTime<Utc>,
    config: &PlanConfig,
) -> Result<(CycleMetadata, CycleAdvance), PlanError> {
    metadata.ensure_matches(plan)?;

    match metadata {
        CycleMetadata::Standard => Ok((CycleMetadata::Standard, CycleAdvance::WalletStyle)),

        CycleMetadata::GoalWeekly {
            weeks_completed,
            current_week_total,
            arrears_amount,
            last_settlement_date,
        } => {
            let (arrears, remainder) = retire_arrears(*arrears_amount, amount);
            let mut total = *current_week_total + remainder;
            let mut completed = *weeks_completed;
            let mut weeks = 0;
            while total >= config.weekly_floor && config.weekly_floor > Decimal::ZERO {
                total -= config.weekly_floor;
                completed += 1;
                weeks += 1;
            }
            Ok((
                CycleMetadata::GoalWeekly {
                    weeks_completed: completed,
                    current_week_total: total,
                    arrears_amount: arrears,
                    last_settlement_date: *last_settlement_date,
                },
                CycleAdvance::WeeksPaid { weeks, weeks_completed: completed },
            ))
        }

        CycleMetadata::MonthlyGoal {
            months_completed,
            month_paid_so_far,
            target_amount,
            selected_duration,
            arrears_amount,
        } => {
            let (arrears, remainder) = retire_arrears(*arrears_amount, amount);
            let mut paid = *month_paid_so_far + remainder;
            let mut completed = *months_completed;
            let mut months = 0;
            while *target_amount > Decimal::ZERO && paid >= *target_amount {
                paid -= *target_amount;
                completed += 1;
                months += 1;
            }
            Ok((
                CycleMetadata::MonthlyGoal {
                    months_completed: completed,
                    month_paid_so_far: paid,
                    target_amount: *target_amount,
                    selected_duration: *selected_duration,
                    arrears_amount: arrears,
                },
                CycleAdvance::MonthsPaid { months, months_completed: completed },
            ))
        }

        CycleMetadata::FixedWeekly {
            selected_duration,
            weeks_completed,
            week_paid_so_far,
            fixed_amount,
            arrears_amount,
        } => {
            let (arrears, remainder) = retire_arrears(*arrears_amount, amount);
            let mut paid = *week_paid_so_far + remainder;
            let mut completed = *weeks_completed;
            let mut weeks = 0;
            while *fixed_amount > Decimal::ZERO && paid >= *fixed_amount {
                paid -= *fixed_amount;
                completed += 1;
                weeks += 1;
            }
            Ok((
                CycleMetadata::FixedWeekly {
                    selected_duration: *selected_duration,
                    weeks_completed: completed,
                    week_paid_so_far: paid,
                    fixed_amount: *fixed_amount,
                    arrears_amount: arrears,
                },
                CycleAdvance::WeeksPaid { weeks, weeks_completed: completed },
            ))
        }

        CycleMetadata::FixedDaily {
            fixed_amount,
            selected_duration,
            total_days_paid,
            withdrawn,
            withdrawn_amount,
            ..
        } => {
            let days = if *fixed_amount > Decimal::ZERO {
                (amount / *fixed_amount).floor().to_u32().unwrap_or(0)
            } else {
                0
            };
            let total = *total_days_paid + days;
            Ok((
                CycleMetadata::FixedDaily {
                    fixed_amount: *fixed_amount,
                    selected_duration: *selected_duration,
                    total_days_paid: total,
                    last_payment_date: Some(now),
                    withdrawn: *withdrawn,
                    withdrawn_amount: *withdrawn_amount,
                },
                CycleAdvance::DaysAdvanced { days, total_days_paid: total },
            ))
        }

        CycleMetadata::Circle {
            fixed_amount,
            picking_turns,
            current_week,
            week_paid,
            missed_weeks,
        } => {
            let mut units = if *fixed_amount > Decimal::ZERO {
                (amount / *fixed_amount).floor().to_u32().unwrap_or(0)
            } else {
                0
            };
            let mut paid = *week_paid;
            if !paid && units > 0 {
                paid = true;
                units -= 1;
            }
            // Surplus units retire the missed-weeks backlog; the season
            // clock, not payments, advances current_week.
            let missed_cleared = units.min(*missed_weeks);
            Ok((
                CycleMetadata::Circle {
                    fixed_amount: *fixed_amount,
                    picking_turns: picking_turns.clone(),
                    current_week: *current_week,
                    week_paid: paid,
                    missed_weeks: *missed_weeks - missed_cleared,
                },
                CycleAdvance::CircleWeekPaid { week: *current_week, missed_cleared },
            ))
        }
    }
}

/// Pay down arrears first; returns (new arrears, remainder for the period).
fn retire_arrears(arrears: Decimal, amount: Decimal) -> (Decimal, Decimal) {
    let paid = arrears.min(amount);
    (arrears - paid, amount - paid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::PlanArchetype;
    use crate::plan::ContributionMode;
    use rust_decimal_macros::dec;

    fn config() -> PlanConfig {
        PlanConfig::default()
    }

    #[test]
    fn test_monthly_goal_exact_completion_single_increment() {
        let plan = Plan::new("m", PlanArchetype::MonthlyGoal, ContributionMode::Flexible);
        let meta = CycleMetadata::MonthlyGoal {
            months_completed: 0,
            month_paid_so_far: dec!(8000),
            target_amount: dec!(20000),
            selected_duration: 6,
            arrears_amount: dec!(0),
        };
        let (next, advance) = apply_credit(&meta, &plan, dec!(12000), Utc::now(), &config()).unwrap();
        match &next {
            CycleMetadata::MonthlyGoal { months_completed, month_paid_so_far, .. } => {
                assert_eq!(*months_completed, 1);
                assert_eq!(*month_paid_so_far, dec!(0));
            }
            _ => panic!("wrong variant"),
        }
        assert_eq!(advance, CycleAdvance::MonthsPaid { months: 1, months_completed: 1 });

        // Re-evaluating the settled state must not double-increment.
        let (next2, _) = apply_credit(&next, &plan, dec!(0), Utc::now(), &config()).unwrap();
        match next2 {
            CycleMetadata::MonthlyGoal { months_completed, .. } => assert_eq!(months_completed, 1),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_goal_weekly_lump_sum_rolls_weeks() {
        let plan = Plan::new("w", PlanArchetype::GoalWeeklyStrict, ContributionMode::Flexible);
        let meta = CycleMetadata::GoalWeekly {
            weeks_completed: 4,
            current_week_total: dec!(1000),
            arrears_amount: dec!(0),
            last_settlement_date: Utc::now(),
        };
        let (next, advance) = apply_credit(&meta, &plan, dec!(8000), Utc::now(), &config()).unwrap();
        match next {
            CycleMetadata::GoalWeekly { weeks_completed, current_week_total, .. } => {
                assert_eq!(weeks_completed, 7); // 9000 total = 3 weeks
                assert_eq!(current_week_total, dec!(0));
            }
            _ => panic!("wrong variant"),
        }
        assert_eq!(advance, CycleAdvance::WeeksPaid { weeks: 3, weeks_completed: 7 });
    }

    #[test]
    fn test_goal_weekly_arrears_retired_first() {
        let plan = Plan::new("w", PlanArchetype::GoalWeeklyRolling, ContributionMode::Flexible);
        let meta = CycleMetadata::GoalWeekly {
            weeks_completed: 2,
            current_week_total: dec!(0),
            arrears_amount: dec!(1500),
            last_settlement_date: Utc::now(),
        };
        let (next, _) = apply_credit(&meta, &plan, dec!(2000), Utc::now(), &config()).unwrap();
        match next {
            CycleMetadata::GoalWeekly { arrears_amount, current_week_total, weeks_completed, .. } => {
                assert_eq!(arrears_amount, dec!(0));
                assert_eq!(current_week_total, dec!(500));
                assert_eq!(weeks_completed, 2);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_fixed_daily_advances_whole_days() {
        let plan = Plan::new("d", PlanArchetype::FixedDaily, ContributionMode::Fixed);
        let meta = CycleMetadata::FixedDaily {
            fixed_amount: dec!(1000),
            selected_duration: crate::subscription::DurationChoice::Days(31),
            total_days_paid: 5,
            last_payment_date: None,
            withdrawn: false,
            withdrawn_amount: dec!(0),
        };
        let now = Utc::now();
        let (next, advance) = apply_credit(&meta, &plan, dec!(3500), now, &config()).unwrap();
        match next {
            CycleMetadata::FixedDaily { total_days_paid, last_payment_date, .. } => {
                assert_eq!(total_days_paid, 8);
                assert_eq!(last_payment_date, Some(now));
            }
            _ => panic!("wrong variant"),
        }
        assert_eq!(advance, CycleAdvance::DaysAdvanced { days: 3, total_days_paid: 8 });
    }

    #[test]
    fn test_circle_week_paid_and_missed_backlog() {
        let plan = Plan::new("c", PlanArchetype::Circle, ContributionMode::Fixed);
        let meta = CycleMetadata::Circle {
            fixed_amount: dec!(5000),
            picking_turns: vec![4],
            current_week: 3,
            week_paid: false,
            missed_weeks: 2,
        };
        // Three units: current week + two missed weeks.
        let (next, advance) = apply_credit(&meta, &plan, dec!(15000), Utc::now(), &config()).unwrap();
        match next {
            CycleMetadata::Circle { week_paid, missed_weeks, current_week, .. } => {
                assert!(week_paid);
                assert_eq!(missed_weeks, 0);
                assert_eq!(current_week, 3); // season clock unchanged
            }
            _ => panic!("wrong variant"),
        }
        assert_eq!(advance, CycleAdvance::CircleWeekPaid { week: 3, missed_cleared: 2 });
    }

    #[test]
    fn test_standard_is_a_no_op_on_metadata() {
        let plan = Plan::new("s", PlanArchetype::Standard, ContributionMode::Flexible);
        let (next, advance) =
            apply_credit(&CycleMetadata::Standard, &plan, dec!(10000), Utc::now(), &config()).unwrap();
        assert_eq!(next, CycleMetadata::Standard);
        assert_eq!(advance, CycleAdvance::WalletStyle);
    }

    #[test]
    fn test_wrong_metadata_rejected() {
        let plan = Plan::new("c", PlanArchetype::Circle, ContributionMode::Fixed);
        let err = apply_credit(&CycleMetadata::Standard, &plan, dec!(5000), Utc::now(), &config())
            .unwrap_err();
        assert!(matches!(err, PlanError::ArchetypeMismatch { .. }));
    }

    #[test]
    fn test_advance_display_messages() {
        assert_eq!(
            CycleAdvance::WeeksPaid { weeks: 2, weeks_completed: 9 }.to_string(),
            "2 week(s) paid, 9 completed"
        );
        assert_eq!(
            CycleAdvance::CircleWeekPaid { week: 4, missed_cleared: 0 }.to_string(),
            "week 4 paid"
        );
        assert_eq!(
            CycleAdvance::DaysAdvanced { days: 3, total_days_paid: 8 }.to_string(),
            "3 day(s) advanced, 8 total"
        );
    }
}
