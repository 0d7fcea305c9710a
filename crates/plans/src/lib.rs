//! Kolo Plans - Saving-plan archetypes and the rule engine
//!
//! This is the HEART of Kolo. A plan subscription carries archetype-specific
//! cycle metadata; the stateless `RuleEngine` reads a snapshot of that
//! metadata (plus the plan and a point-in-time balance/date) and decides the
//! mandated contribution, input lock, fee, advance-payment coverage and
//! maturity. `apply_credit` is the pure half of the atomic plan-credit
//! operation; stores wrap it in their own transaction.
//!
//! # Key Types
//! - `PlanArchetype` / `Plan`: product definitions
//! - `PlanSubscription` / `CycleMetadata`: one user's progress state
//! - `RuleEngine` / `RuleVerdict`: the per-period decision
//! - `CycleAdvance`: what cycle unit a credit satisfied
//! - `MaturityMonitor`: idempotent status sweep

pub mod archetype;
pub mod breakout;
pub mod config;
pub mod credit;
pub mod error;
pub mod maturity;
pub mod plan;
pub mod rules;
pub mod subscription;

pub use archetype::PlanArchetype;
pub use breakout::{break_plan, BreakOutcome};
pub use config::PlanConfig;
pub use credit::{apply_credit, CycleAdvance};
pub use error::PlanError;
pub use maturity::{settle_elapsed_weeks, MaturityMonitor, StatusChange};
pub use plan::{ContributionMode, Plan};
pub use rules::{RuleEngine, RuleVerdict};
pub use subscription::{CycleMetadata, DurationChoice, PlanSubscription, SubscriptionStatus};
