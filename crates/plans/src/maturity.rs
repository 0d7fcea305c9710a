//! Maturity monitor - opportunistic, idempotent status sweep
//!
//! Invoked whenever a caller lists a user's subscriptions. Pure comparison
//! against `now` followed by a conditional status change; a subscription
//! already matured/completed is skipped, so payout side effects never
//! re-fire.

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::plan::Plan;
use crate::rules::RuleEngine;
use crate::subscription::{CycleMetadata, PlanSubscription, SubscriptionStatus};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// One conditional status update produced by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub subscription: Uuid,
    pub from: SubscriptionStatus,
    pub to: SubscriptionStatus,
}

/// Re-evaluates active subscriptions against their duration/target rule.
#[derive(Debug, Clone, Default)]
pub struct MaturityMonitor {
    engine: RuleEngine,
}

impl MaturityMonitor {
    pub fn new(engine: RuleEngine) -> Self {
        Self { engine }
    }

    /// Check a single subscription; mutates it when a transition is due.
    ///
    /// Safe to call repeatedly and concurrently for the same snapshot: the
    /// comparison is pure and non-active statuses short-circuit.
    pub fn check(
        &self,
        sub: &mut PlanSubscription,
        plan: &Plan,
        now: DateTime<Utc>,
    ) -> Result<Option<StatusChange>, PlanError> {
        match sub.status {
            SubscriptionStatus::Active => {
                settle_elapsed_weeks(&mut sub.metadata, now, self.engine.config());
                // Circle season clock: one week per elapsed calendar week
                // since the subscription started.
                while let CycleMetadata::Circle { current_week, .. } = &sub.metadata {
                    let elapsed = (now - sub.started_at).num_weeks().max(0) as u32 + 1;
                    if *current_week >= elapsed {
                        break;
                    }
                    advance_circle_week(&mut sub.metadata);
                }
                let verdict = self.engine.evaluate(sub, plan, now)?;
                if verdict.matured {
                    let from = sub.status;
                    sub.advance_status(SubscriptionStatus::Matured)?;
                    tracing::info!(subscription = %sub.id, "subscription matured");
                    return Ok(Some(StatusChange {
                        subscription: sub.id,
                        from,
                        to: SubscriptionStatus::Matured,
                    }));
                }
                Ok(None)
            }
            // Daily plans reset: matured funds withdrawn ends the cycle.
            SubscriptionStatus::Matured if plan.archetype.resets_after_withdrawal() => {
                if let CycleMetadata::FixedDaily { withdrawn: true, .. } = sub.metadata {
                    let from = sub.status;
                    sub.advance_status(SubscriptionStatus::Completed)?;
                    return Ok(Some(StatusChange {
                        subscription: sub.id,
                        from,
                        to: SubscriptionStatus::Completed,
                    }));
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Sweep a batch of (subscription, plan) pairs, as done on every
    /// subscription listing.
    pub fn sweep<'a, I>(&self, items: I, now: DateTime<Utc>) -> Result<Vec<StatusChange>, PlanError>
    where
        I: IntoIterator<Item = (&'a mut PlanSubscription, &'a Plan)>,
    {
        let mut changes = Vec::new();
        for (sub, plan) in items {
            if let Some(change) = self.check(sub, plan, now)? {
                changes.push(change);
            }
        }
        Ok(changes)
    }
}

/// Roll the weekly-goal cycle forward over elapsed weeks: each closed week
/// short of the floor adds the shortfall to arrears and resets the
/// accumulator. No-op for other metadata shapes.
pub fn settle_elapsed_weeks(metadata: &mut CycleMetadata, now: DateTime<Utc>, config: &PlanConfig) {
    if let CycleMetadata::GoalWeekly {
        current_week_total,
        arrears_amount,
        last_settlement_date,
        ..
    } = metadata
    {
        while now - *last_settlement_date >= Duration::weeks(1) {
            let shortfall = (config.weekly_floor - *current_week_total).max(Decimal::ZERO);
            *arrears_amount += shortfall;
            *current_week_total = Decimal::ZERO;
            *last_settlement_date += Duration::weeks(1);
        }
    }
}

/// Advance a circle's season clock by one week. An unpaid week goes into
/// the missed backlog. Caller drives this from the season schedule.
pub fn advance_circle_week(metadata: &mut CycleMetadata) {
    if let CycleMetadata::Circle {
        current_week,
        week_paid,
        missed_weeks,
        ..
    } = metadata
    {
        if !*week_paid {
            *missed_weeks += 1;
        }
        *current_week += 1;
        *week_paid = false;
    }
}
