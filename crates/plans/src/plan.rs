//! Plan - admin-managed product definitions

use crate::archetype::PlanArchetype;
use chrono::{DateTime, Utc};
use kolo_core::Amount;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Whether the contribution amount is fixed by the product or chosen by
/// the user (subject to the archetype's floor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContributionMode {
    Fixed,
    Flexible,
}

/// A saving-plan product. Read-mostly; edited by an administrator and
/// retired by soft-deactivation (`active = false`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub archetype: PlanArchetype,
    pub mode: ContributionMode,
    /// Floor for flexible contributions
    pub min_amount: Amount,
    /// Per-period amount for fixed-mode archetypes
    pub fixed_amount: Amount,
    /// Product duration in the archetype's period unit (weeks or months)
    pub duration: u32,
    pub service_charge: Amount,
    pub active: bool,
    /// Archetype-specific config (circle tiers, season start, ...)
    #[serde(default)]
    pub extra: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(name: impl Into<String>, archetype: PlanArchetype, mode: ContributionMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            archetype,
            mode,
            min_amount: Amount::ZERO,
            fixed_amount: Amount::ZERO,
            duration: 0,
            service_charge: Amount::ZERO,
            active: true,
            extra: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_min_amount(mut self, min: Amount) -> Self {
        self.min_amount = min;
        self
    }

    pub fn with_fixed_amount(mut self, fixed: Amount) -> Self {
        self.fixed_amount = fixed;
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_service_charge(mut self, charge: Amount) -> Self {
        self.service_charge = charge;
        self
    }

    /// Soft-deactivate: the plan disappears from join lists but existing
    /// subscriptions keep running.
    pub fn archive(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_plan_is_active() {
        let plan = Plan::new("Weekly Sprint", PlanArchetype::GoalWeeklyStrict, ContributionMode::Flexible);
        assert!(plan.active);
        assert_eq!(plan.archetype, PlanArchetype::GoalWeeklyStrict);
    }

    #[test]
    fn test_archive_is_soft() {
        let mut plan = Plan::new("Circle of 10", PlanArchetype::Circle, ContributionMode::Fixed)
            .with_fixed_amount(Amount::from_major(5000));
        plan.archive();
        assert!(!plan.active);
        assert_eq!(plan.fixed_amount, Amount::from_major(5000));
    }
}
