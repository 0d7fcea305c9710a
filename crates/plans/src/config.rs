//! Plan rule thresholds, configurable via file/env rather than hardcoded
//!
//! Production numbers (weekly floor, penalty percentage, circle fee tiers,
//! fixed term lengths) can be tuned without recompilation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for the plan rule engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Weekly contribution floor for the goal-weekly archetypes
    #[serde(default = "default_weekly_floor")]
    pub weekly_floor: Decimal,

    /// Flat percentage charged when a cancellable plan is broken early
    #[serde(default = "default_break_penalty_pct")]
    pub break_penalty_pct: Decimal,

    /// Term length of the strict-duration weekly goal
    #[serde(default = "default_strict_weeks")]
    pub strict_duration_weeks: u32,

    /// Term length of the discipline-locked weekly goal
    #[serde(default = "default_locked_weeks")]
    pub locked_duration_weeks: u32,

    /// Season length of a circle
    #[serde(default = "default_circle_weeks")]
    pub circle_season_weeks: u32,

    /// Circle contribution fee tiers, inclusive lower bounds, highest first
    #[serde(default = "default_circle_fee_tiers")]
    pub circle_fee_tiers: Vec<FeeTier>,
}

/// One row of the circle fee schedule: contributions of at least `min`
/// (and below the next tier up) pay `fee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    pub min: Decimal,
    pub fee: Decimal,
}

fn default_weekly_floor() -> Decimal {
    Decimal::new(3_000, 0)
}

fn default_break_penalty_pct() -> Decimal {
    Decimal::new(5, 0)
}

fn default_strict_weeks() -> u32 {
    48
}

fn default_locked_weeks() -> u32 {
    30
}

fn default_circle_weeks() -> u32 {
    10
}

fn default_circle_fee_tiers() -> Vec<FeeTier> {
    vec![
        FeeTier { min: Decimal::new(100_000, 0), fee: Decimal::new(1_000, 0) },
        FeeTier { min: Decimal::new(20_000, 0), fee: Decimal::new(500, 0) },
        FeeTier { min: Decimal::new(15_000, 0), fee: Decimal::new(300, 0) },
        FeeTier { min: Decimal::new(10_000, 0), fee: Decimal::new(200, 0) },
    ]
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            weekly_floor: default_weekly_floor(),
            break_penalty_pct: default_break_penalty_pct(),
            strict_duration_weeks: default_strict_weeks(),
            locked_duration_weeks: default_locked_weeks(),
            circle_season_weeks: default_circle_weeks(),
            circle_fee_tiers: default_circle_fee_tiers(),
        }
    }
}

impl PlanConfig {
    /// Fee for a circle contribution: first tier whose inclusive lower
    /// bound the amount meets. Below every tier the fee is zero.
    pub fn circle_fee(&self, amount: Decimal) -> Decimal {
        self.circle_fee_tiers
            .iter()
            .find(|tier| amount >= tier.min)
            .map(|tier| tier.fee)
            .unwrap_or(Decimal::ZERO)
    }
}
