//! Integration tests for Kolo
//!
//! These verify the complete flow from the orchestrator through the
//! deposit router, rule engine, stores and loan engine.

use chrono::{Duration, Utc};
use kolo_core::Amount;
use kolo_deposit::{DepositChannel, DepositOutcome, DepositRequest};
use kolo_loan::{IdVerification, LoanConfig, LoanStatus};
use kolo_plans::{
    ContributionMode, CycleMetadata, Plan, PlanArchetype, RuleEngine, SubscriptionStatus,
};
use kolo_rpc::AppContext;
use kolo_store::{LedgerStore, MemoryStore, SqliteStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn memory_ctx() -> AppContext<MemoryStore> {
    AppContext::new(
        Arc::new(MemoryStore::default()),
        RuleEngine::default(),
        LoanConfig::default(),
    )
}

async fn fund_wallet<S>(ctx: &AppContext<S>, user: Uuid, amount: Decimal)
where
    S: LedgerStore + kolo_store::PlanCredit,
{
    let outcome = ctx
        .router
        .deposit(
            DepositRequest {
                user,
                subscription: None,
                amount,
                channel: DepositChannel::External {
                    receipt_url: "https://receipts.example/t".into(),
                },
            },
            Utc::now(),
        )
        .await
        .unwrap();
    let DepositOutcome::PendingApproval { entry } = outcome else {
        panic!("expected pending approval");
    };
    ctx.approve_deposit(entry).await.unwrap();
}

async fn plan_deposit<S>(ctx: &AppContext<S>, user: Uuid, subscription: Uuid, amount: Decimal)
where
    S: LedgerStore + kolo_store::PlanCredit,
{
    ctx.router
        .deposit(
            DepositRequest {
                user,
                subscription: Some(subscription),
                amount,
                channel: DepositChannel::WalletTransfer,
            },
            Utc::now(),
        )
        .await
        .unwrap();
}

/// Deposit -> approve -> contribute to maturity -> sweep on listing.
#[tokio::test]
async fn test_savings_journey_to_maturity() {
    let ctx = memory_ctx();
    let user = Uuid::new_v4();

    let plan = Plan::new("Monthly Target", PlanArchetype::MonthlyGoal, ContributionMode::Flexible)
        .with_fixed_amount(Amount::from_major(20000))
        .with_duration(2);
    let plan_id = plan.id;
    ctx.store().insert_plan(plan).await.unwrap();

    let sub = ctx.join_plan(user, plan_id, Utc::now()).await.unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Active);

    fund_wallet(&ctx, user, dec!(50000)).await;
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(50000));

    // Two full monthly targets complete the two-month duration.
    plan_deposit(&ctx, user, sub.id, dec!(20000)).await;
    plan_deposit(&ctx, user, sub.id, dec!(20000)).await;
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(10000));

    let (subs, changes) = ctx.subscriptions(user, Utc::now()).await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].to, SubscriptionStatus::Matured);
    assert_eq!(subs[0].0.balance, dec!(40000));
    assert_eq!(subs[0].0.status, SubscriptionStatus::Matured);

    // A second listing must not re-fire the transition.
    let (_, changes) = ctx.subscriptions(user, Utc::now()).await.unwrap();
    assert!(changes.is_empty());
}

/// Listing settles elapsed weekly cycles and writes the accrued arrears
/// back to the store, even when no status transition fired.
#[tokio::test]
async fn test_settled_arrears_persist_after_listing() {
    let ctx = memory_ctx();
    let user = Uuid::new_v4();

    let plan = Plan::new("Weekly Sprint", PlanArchetype::GoalWeeklyStrict, ContributionMode::Flexible);
    let plan_id = plan.id;
    ctx.store().insert_plan(plan).await.unwrap();

    // Joined three weeks ago, no contributions since.
    let started = Utc::now() - Duration::weeks(3) - Duration::days(1);
    let sub = ctx.join_plan(user, plan_id, started).await.unwrap();

    let (_, changes) = ctx.subscriptions(user, Utc::now()).await.unwrap();
    assert!(changes.is_empty());

    let stored = ctx.store().get_subscription(sub.id).await.unwrap();
    match stored.metadata {
        CycleMetadata::GoalWeekly { arrears_amount, .. } => {
            // Three fully missed weeks at the 3000 floor.
            assert_eq!(arrears_amount, dec!(9000));
        }
        _ => panic!("wrong variant"),
    }
}

/// Break refunds 95% to the wallet and records the penalty.
#[tokio::test]
async fn test_break_plan_settles_to_wallet() {
    let ctx = memory_ctx();
    let user = Uuid::new_v4();

    let plan = Plan::new("Weekly Sprint", PlanArchetype::GoalWeeklyStrict, ContributionMode::Flexible);
    let plan_id = plan.id;
    ctx.store().insert_plan(plan).await.unwrap();
    let sub = ctx.join_plan(user, plan_id, Utc::now()).await.unwrap();

    fund_wallet(&ctx, user, dec!(10000)).await;
    plan_deposit(&ctx, user, sub.id, dec!(10000)).await;
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(0));

    let settlement = ctx.break_plan(user, sub.id, Utc::now()).await.unwrap();
    assert_eq!(settlement.outcome.refund, dec!(9500));
    assert_eq!(settlement.outcome.penalty, dec!(500));
    assert!(settlement.penalty_entry.is_some());

    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(9500));
    let sub = ctx.store().get_subscription(sub.id).await.unwrap();
    assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    assert_eq!(sub.balance, dec!(0));
}

/// Assess -> request -> disburse -> repay to settlement.
#[tokio::test]
async fn test_loan_lifecycle() {
    let ctx = memory_ctx();
    let user = Uuid::new_v4();

    let plan = Plan::new("Flexi Pot", PlanArchetype::Standard, ContributionMode::Flexible);
    let plan_id = plan.id;
    ctx.store().insert_plan(plan).await.unwrap();
    ctx.join_plan(user, plan_id, Utc::now()).await.unwrap();
    fund_wallet(&ctx, user, dec!(100000)).await;

    let assessment = ctx
        .assess_loan(user, 13, IdVerification::Verified)
        .await
        .unwrap();
    assert!(assessment.eligible);
    assert_eq!(assessment.maximum, dec!(70000.00));
    assert_eq!(assessment.max_duration_months, 1);

    let (loan, requires_review) = ctx
        .request_loan(user, dec!(50000), dec!(10), 1, 13, IdVerification::Verified, Utc::now())
        .await
        .unwrap();
    assert!(!requires_review);
    assert_eq!(loan.total_payable, dec!(55000.0));
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(150000));

    // Outstanding debt reduces what a second loan could draw.
    let assessment = ctx
        .assess_loan(user, 13, IdVerification::Verified)
        .await
        .unwrap();
    assert_eq!(assessment.available, dec!(50000));

    let (loan, remaining) = ctx
        .repay_loan(user, loan.id, dec!(55000), Utc::now())
        .await
        .unwrap();
    assert_eq!(remaining, dec!(0));
    assert_eq!(loan.status, LoanStatus::Paid);
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(95000));
}

/// A repayment larger than the wallet projection is rejected before any
/// entry or loan mutation is written.
#[tokio::test]
async fn test_repayment_exceeding_wallet_rejected() {
    let ctx = memory_ctx();
    let user = Uuid::new_v4();

    let plan = Plan::new("Flexi Pot", PlanArchetype::Standard, ContributionMode::Flexible);
    let plan_id = plan.id;
    ctx.store().insert_plan(plan).await.unwrap();
    ctx.join_plan(user, plan_id, Utc::now()).await.unwrap();
    fund_wallet(&ctx, user, dec!(100000)).await;

    let (loan, _) = ctx
        .request_loan(user, dec!(50000), dec!(10), 1, 13, IdVerification::Verified, Utc::now())
        .await
        .unwrap();
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(150000));

    let err = ctx
        .repay_loan(user, loan.id, dec!(200000), Utc::now())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("insufficient wallet balance"));

    // Nothing moved.
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(150000));
    let loans = ctx.store().loans_for_user(user).await.unwrap();
    assert_eq!(loans[0].status, LoanStatus::Active);
    assert_eq!(loans[0].total_payable, dec!(55000.0));
}

/// The SQLite-backed context persists across reopen.
#[tokio::test]
async fn test_sqlite_context_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let user = Uuid::new_v4();
    let plan = Plan::new("Monthly Target", PlanArchetype::MonthlyGoal, ContributionMode::Flexible)
        .with_fixed_amount(Amount::from_major(20000))
        .with_duration(6);
    let plan_id = plan.id;
    let sub_id;

    {
        let ctx: AppContext<SqliteStore> = AppContext::open(dir.path()).await.unwrap();
        ctx.store().insert_plan(plan).await.unwrap();
        let sub = ctx.join_plan(user, plan_id, Utc::now()).await.unwrap();
        sub_id = sub.id;
        fund_wallet(&ctx, user, dec!(50000)).await;
        plan_deposit(&ctx, user, sub_id, dec!(20000)).await;
    }

    let ctx: AppContext<SqliteStore> = AppContext::open(dir.path()).await.unwrap();
    assert_eq!(ctx.wallet_balance(user).await.unwrap(), dec!(30000));
    let sub = ctx.store().get_subscription(sub_id).await.unwrap();
    assert_eq!(sub.balance, dec!(20000));
}
