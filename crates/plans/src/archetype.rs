//! Plan archetypes - the structurally distinct saving-plan behaviors
//!
//! Seven cyclical archetypes plus the metadata-free `Standard` wallet-style
//! plan. The archetype decides which `CycleMetadata` variant a subscription
//! carries and which rules apply to it.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Saving-plan archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanArchetype {
    /// Free-form savings pot, no cycle metadata
    Standard,
    /// Weekly goal, fixed 48-week duration
    GoalWeeklyStrict,
    /// Weekly goal, rolling (never matures by week count)
    GoalWeeklyRolling,
    /// Weekly goal, discipline-locked 30-week term; cannot be broken
    GoalWeeklyLocked,
    /// Monthly target amount over a chosen number of months
    MonthlyGoal,
    /// Fixed weekly contribution over a chosen number of weeks
    FixedWeekly,
    /// Fixed daily contribution, chosen day count or continuous
    FixedDaily,
    /// Pooled rotating circle with picking turns; cannot be broken
    Circle,
}

impl PlanArchetype {
    /// The three weekly-goal variants share one metadata shape.
    pub fn is_goal_weekly(&self) -> bool {
        matches!(
            self,
            PlanArchetype::GoalWeeklyStrict
                | PlanArchetype::GoalWeeklyRolling
                | PlanArchetype::GoalWeeklyLocked
        )
    }

    /// Whether the break (early cancel) operation is permitted at all.
    /// Strict-discipline archetypes disallow it outright.
    pub fn cancellable(&self) -> bool {
        !matches!(self, PlanArchetype::GoalWeeklyLocked | PlanArchetype::Circle)
    }

    /// Archetypes that reset to a fresh cycle after matured funds are
    /// withdrawn (matured -> completed).
    pub fn resets_after_withdrawal(&self) -> bool {
        matches!(self, PlanArchetype::FixedDaily | PlanArchetype::FixedWeekly)
    }

    /// Archetypes whose subscriptions start in `pending_activation`
    /// (a circle waits for its season to open).
    pub fn joins_pending(&self) -> bool {
        matches!(self, PlanArchetype::Circle)
    }
}
