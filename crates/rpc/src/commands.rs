//! CLI commands - thin printing wrappers over `AppContext`

use crate::context::AppContext;
use chrono::Utc;
use kolo_core::Amount;
use kolo_deposit::{DepositChannel, DepositOutcome, DepositRequest};
use kolo_loan::IdVerification;
use kolo_plans::{ContributionMode, Plan, PlanArchetype};
use kolo_store::{LedgerStore, PlanCredit};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Seed the product catalog: one plan per archetype with production-like
/// defaults. Idempotent only in the sense that re-running adds fresh plans.
pub async fn init<S: LedgerStore + PlanCredit>(ctx: &AppContext<S>) -> Result<(), anyhow::Error> {
    let plans = vec![
        Plan::new("Flexi Pot", PlanArchetype::Standard, ContributionMode::Flexible)
            .with_min_amount(Amount::from_major(100)),
        Plan::new("Weekly Sprint", PlanArchetype::GoalWeeklyStrict, ContributionMode::Flexible),
        Plan::new("Weekly Rolling", PlanArchetype::GoalWeeklyRolling, ContributionMode::Flexible),
        Plan::new("Weekly Locked", PlanArchetype::GoalWeeklyLocked, ContributionMode::Flexible),
        Plan::new("Monthly Target", PlanArchetype::MonthlyGoal, ContributionMode::Flexible)
            .with_fixed_amount(Amount::from_major(20000))
            .with_duration(6),
        Plan::new("Fixed Weekly", PlanArchetype::FixedWeekly, ContributionMode::Fixed)
            .with_fixed_amount(Amount::from_major(5000))
            .with_duration(12),
        Plan::new("Daily Stash", PlanArchetype::FixedDaily, ContributionMode::Fixed)
            .with_fixed_amount(Amount::from_major(500))
            .with_duration(31),
        Plan::new("Savings Circle", PlanArchetype::Circle, ContributionMode::Fixed)
            .with_fixed_amount(Amount::from_major(20000)),
    ];
    println!("Seeded plan catalog:");
    for plan in plans {
        println!("  {}  {:30} {}", plan.id, plan.name, plan.archetype);
        ctx.store().insert_plan(plan).await?;
    }
    Ok(())
}

pub async fn join_plan<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    plan: Uuid,
) -> Result<(), anyhow::Error> {
    let sub = ctx.join_plan(user, plan, Utc::now()).await?;
    println!("Joined plan: subscription {} ({})", sub.id, sub.status);
    Ok(())
}

/// External deposit: funds land pending until an operator approves.
pub async fn deposit<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    amount: Decimal,
    receipt_url: String,
    subscription: Option<Uuid>,
) -> Result<(), anyhow::Error> {
    let outcome = ctx
        .router
        .deposit(
            DepositRequest {
                user,
                subscription,
                amount,
                channel: DepositChannel::External { receipt_url },
            },
            Utc::now(),
        )
        .await?;
    if let DepositOutcome::PendingApproval { entry } = outcome {
        println!("Deposit of {} recorded as pending entry {}", amount, entry);
    }
    Ok(())
}

pub async fn approve<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    entry: Uuid,
) -> Result<(), anyhow::Error> {
    ctx.approve_deposit(entry).await?;
    println!("Entry {} approved", entry);
    Ok(())
}

/// Move money from the wallet into a plan subscription.
pub async fn wallet_deposit<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    subscription: Uuid,
    amount: Decimal,
) -> Result<(), anyhow::Error> {
    let outcome = ctx
        .router
        .deposit(
            DepositRequest {
                user,
                subscription: Some(subscription),
                amount,
                channel: DepositChannel::WalletTransfer,
            },
            Utc::now(),
        )
        .await?;
    match outcome {
        DepositOutcome::PlanCredited { receipt, .. } => {
            println!("{}", receipt.advance);
            if receipt.fee > Decimal::ZERO {
                println!("Fee charged: {}", receipt.fee);
            }
            println!("Plan balance: {}", receipt.new_balance);
        }
        DepositOutcome::PotCredited { new_balance, .. } => {
            println!("Pot balance: {}", new_balance);
        }
        DepositOutcome::PendingApproval { entry } => {
            anyhow::bail!("wallet transfer unexpectedly left pending (entry {entry})")
        }
    }
    Ok(())
}

pub async fn balance<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
) -> Result<(), anyhow::Error> {
    let balance = ctx.wallet_balance(user).await?;
    println!("Wallet balance for {}: {}", user, balance);
    Ok(())
}

/// List subscriptions; the maturity sweep runs as part of listing.
pub async fn subscriptions<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
) -> Result<(), anyhow::Error> {
    let (subs, changes) = ctx.subscriptions(user, Utc::now()).await?;
    for change in &changes {
        println!("Subscription {}: {} -> {}", change.subscription, change.from, change.to);
    }
    if subs.is_empty() {
        println!("No subscriptions");
    }
    for (sub, plan) in subs {
        println!(
            "{}  {:20} {:20} balance {:>12}  {}",
            sub.id, plan.name, plan.archetype, sub.balance, sub.status
        );
    }
    Ok(())
}

pub async fn break_plan<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    subscription: Uuid,
) -> Result<(), anyhow::Error> {
    let settlement = ctx.break_plan(user, subscription, Utc::now()).await?;
    println!(
        "Plan broken: {} refunded to wallet, {} penalty charged",
        settlement.outcome.refund, settlement.outcome.penalty
    );
    Ok(())
}

fn verification(verified: bool) -> IdVerification {
    if verified {
        IdVerification::Verified
    } else {
        IdVerification::Unverified
    }
}

pub async fn loan_assess<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    account_age_months: u32,
    verified: bool,
) -> Result<(), anyhow::Error> {
    let assessment = ctx
        .assess_loan(user, account_age_months, verification(verified))
        .await?;
    if !assessment.eligible {
        println!("Not eligible for a loan");
        return Ok(());
    }
    println!("Maximum:  {}", assessment.maximum);
    println!("Available: {}", assessment.available);
    println!("Max duration: {} month(s)", assessment.max_duration_months);
    Ok(())
}

pub async fn loan_request<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    principal: Decimal,
    rate: Decimal,
    duration: u32,
    account_age_months: u32,
    verified: bool,
) -> Result<(), anyhow::Error> {
    let (loan, requires_review) = ctx
        .request_loan(
            user,
            principal,
            rate,
            duration,
            account_age_months,
            verification(verified),
            Utc::now(),
        )
        .await?;
    println!(
        "Loan {} disbursed: {} over {} month(s), total payable {}",
        loan.loan_number, loan.principal, loan.duration_months, loan.total_payable
    );
    if requires_review {
        println!("NOTE: amount exceeds the available limit; flagged for administrator review");
    }
    Ok(())
}

pub async fn loan_repay<S: LedgerStore + PlanCredit>(
    ctx: &AppContext<S>,
    user: Uuid,
    loan: Uuid,
    amount: Decimal,
) -> Result<(), anyhow::Error> {
    let (loan, remaining) = ctx.repay_loan(user, loan, amount, Utc::now()).await?;
    if remaining.is_zero() {
        println!("Loan {} fully repaid", loan.loan_number);
    } else {
        println!("Loan {}: {} remaining", loan.loan_number, remaining);
    }
    Ok(())
}
