//! Plan errors

use crate::archetype::PlanArchetype;
use crate::subscription::SubscriptionStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errors from plan and subscription operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Data-integrity bug: stored cycle metadata does not match the owning
    /// plan's archetype. Fatal - never defaulted around.
    #[error("Cycle metadata '{found}' does not match plan {plan} archetype {expected}")]
    ArchetypeMismatch {
        plan: Uuid,
        expected: PlanArchetype,
        found: &'static str,
    },

    #[error("Plan archetype {0} does not permit breaking the plan")]
    BreakNotAllowed(PlanArchetype),

    #[error("Subscription {subscription} is {status}, expected an active subscription")]
    NotActive {
        subscription: Uuid,
        status: SubscriptionStatus,
    },

    #[error("Subscription status can only advance forward: {from} -> {to}")]
    BackwardStatus {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },

    #[error("Plan {0} is no longer active")]
    InactivePlan(Uuid),

    #[error("Fixed-mode plan requires a positive fixed amount")]
    MissingFixedAmount,
}
