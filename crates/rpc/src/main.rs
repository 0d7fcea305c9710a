//! Kolo CLI - Main entry point

use clap::{Parser, Subcommand};
use kolo_rpc::{commands, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kolo")]
#[command(about = "Kolo - savings plans over an append-only ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the plan catalog
    Init,

    /// Join a savings plan
    JoinPlan {
        /// User ID
        user: Uuid,
        /// Plan ID
        plan: Uuid,
    },

    /// Record an external deposit (pending until approved)
    Deposit {
        /// User ID
        user: Uuid,
        /// Amount to deposit
        amount: Decimal,
        /// Payment receipt reference
        #[arg(long)]
        receipt: String,
        /// Target subscription (omit for a wallet top-up)
        #[arg(long)]
        subscription: Option<Uuid>,
    },

    /// Approve a pending deposit entry
    Approve {
        /// Ledger entry ID
        entry: Uuid,
    },

    /// Transfer from the wallet into a plan subscription
    WalletDeposit {
        /// User ID
        user: Uuid,
        /// Target subscription
        subscription: Uuid,
        /// Amount to transfer
        amount: Decimal,
    },

    /// Show the general wallet balance
    Balance {
        /// User ID
        user: Uuid,
    },

    /// List subscriptions (runs the maturity sweep)
    Subscriptions {
        /// User ID
        user: Uuid,
    },

    /// Break a plan early (flat penalty applies)
    BreakPlan {
        /// User ID
        user: Uuid,
        /// Subscription to break
        subscription: Uuid,
    },

    /// Show loan eligibility and limits
    LoanAssess {
        /// User ID
        user: Uuid,
        /// Account age in months
        #[arg(long)]
        age_months: u32,
        /// Government id verified
        #[arg(long)]
        verified: bool,
    },

    /// Request a loan
    LoanRequest {
        /// User ID
        user: Uuid,
        /// Principal amount
        principal: Decimal,
        /// Flat interest rate in percent
        #[arg(long)]
        rate: Decimal,
        /// Duration in months
        #[arg(long)]
        duration: u32,
        /// Account age in months
        #[arg(long)]
        age_months: u32,
        /// Government id verified
        #[arg(long)]
        verified: bool,
    },

    /// Repay against a loan
    LoanRepay {
        /// User ID
        user: Uuid,
        /// Loan ID
        loan: Uuid,
        /// Repayment amount
        amount: Decimal,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let ctx = AppContext::open(&cli.data).await?;

    match cli.command {
        Commands::Init => {
            commands::init(&ctx).await?;
        }

        Commands::JoinPlan { user, plan } => {
            commands::join_plan(&ctx, user, plan).await?;
        }

        Commands::Deposit {
            user,
            amount,
            receipt,
            subscription,
        } => {
            commands::deposit(&ctx, user, amount, receipt, subscription).await?;
        }

        Commands::Approve { entry } => {
            commands::approve(&ctx, entry).await?;
        }

        Commands::WalletDeposit {
            user,
            subscription,
            amount,
        } => {
            commands::wallet_deposit(&ctx, user, subscription, amount).await?;
        }

        Commands::Balance { user } => {
            commands::balance(&ctx, user).await?;
        }

        Commands::Subscriptions { user } => {
            commands::subscriptions(&ctx, user).await?;
        }

        Commands::BreakPlan { user, subscription } => {
            commands::break_plan(&ctx, user, subscription).await?;
        }

        Commands::LoanAssess {
            user,
            age_months,
            verified,
        } => {
            commands::loan_assess(&ctx, user, age_months, verified).await?;
        }

        Commands::LoanRequest {
            user,
            principal,
            rate,
            duration,
            age_months,
            verified,
        } => {
            commands::loan_request(&ctx, user, principal, rate, duration, age_months, verified)
                .await?;
        }

        Commands::LoanRepay { user, loan, amount } => {
            commands::loan_repay(&ctx, user, loan, amount).await?;
        }
    }

    Ok(())
}
