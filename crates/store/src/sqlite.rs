//! SQLite store - durable persistence via sqlx
//!
//! Entries are structured rows; plans, subscriptions and loans are stored
//! as JSON documents keyed by id (their shapes are archetype-dependent).
//! A plan credit runs inside a single transaction, which gives both
//! atomicity and per-subscription serialization (SQLite writers are
//! exclusive).

use crate::error::StoreError;
use crate::traits::{LedgerStore, PlanCredit, PlanCreditReceipt, PlanCreditRequest};
use async_trait::async_trait;
use kolo_core::Amount;
use kolo_ledger::{EntryKind, EntryStatus, LedgerEntry, LedgerEntryBuilder};
use kolo_loan::Loan;
use kolo_plans::{apply_credit, Plan, PlanError, PlanSubscription, RuleEngine, SubscriptionStatus};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// sqlx-backed store.
pub struct SqliteStore {
    pool: SqlitePool,
    engine: RuleEngine,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`.
    pub async fn new(db_path: impl AsRef<Path>, engine: RuleEngine) -> Result<Self, StoreError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&db_url).await?;
        let store = Self { pool, engine };
        store.init().await?;
        Ok(store)
    }

    /// Initialize the schema.
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                scope TEXT,
                kind TEXT NOT NULL,
                amount TEXT NOT NULL,
                fee TEXT NOT NULL,
                status TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL,
                loan_id TEXT,
                receipt_url TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_entries_owner
            ON ledger_entries(owner)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_entries_scope
            ON ledger_entries(scope)
            "#,
        )
        .execute(&self.pool)
        .await?;

        for ddl in [
            "CREATE TABLE IF NOT EXISTS plans (id TEXT PRIMARY KEY, data TEXT NOT NULL)",
            "CREATE TABLE IF NOT EXISTS subscriptions (id TEXT PRIMARY KEY, user_id TEXT NOT NULL, data TEXT NOT NULL)",
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id)",
            "CREATE TABLE IF NOT EXISTS loans (id TEXT PRIMARY KEY, user_id TEXT NOT NULL, data TEXT NOT NULL)",
            "CREATE INDEX IF NOT EXISTS idx_loans_user ON loans(user_id)",
        ] {
            sqlx::query(ddl).execute(&self.pool).await?;
        }

        Ok(())
    }
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry, StoreError> {
    let parse_decimal = |column: &str| -> Result<Decimal, StoreError> {
        let raw: String = row.get(column);
        Decimal::from_str(&raw).map_err(|_| StoreError::MalformedDecimal(raw))
    };
    let parse_uuid = |value: Option<String>| value.and_then(|v| Uuid::parse_str(&v).ok());

    let corrupt = |column: &'static str, value: String| StoreError::CorruptRow { column, value };

    let id: String = row.get("id");
    let owner: String = row.get("owner");
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(LedgerEntry {
        id: Uuid::parse_str(&id).map_err(|_| corrupt("id", id))?,
        owner: Uuid::parse_str(&owner).map_err(|_| corrupt("owner", owner))?,
        scope: parse_uuid(row.get("scope")),
        kind: kind
            .parse::<EntryKind>()
            .map_err(|_| corrupt("kind", kind))?,
        amount: Amount::new_unchecked(parse_decimal("amount")?),
        fee: Amount::new_unchecked(parse_decimal("fee")?),
        status: status
            .parse::<EntryStatus>()
            .map_err(|_| corrupt("status", status))?,
        description: row.get("description"),
        created_at: created_at
            .parse()
            .map_err(|_| corrupt("created_at", created_at))?,
        loan_id: parse_uuid(row.get("loan_id")),
        receipt_url: row.get("receipt_url"),
    })
}

async fn insert_entry_tx<'e, E>(executor: E, entry: &LedgerEntry) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO ledger_entries
            (id, owner, scope, kind, amount, fee, status, description, created_at, loan_id, receipt_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.owner.to_string())
    .bind(entry.scope.map(|s| s.to_string()))
    .bind(entry.kind.to_string())
    .bind(entry.amount.value().to_string())
    .bind(entry.fee.value().to_string())
    .bind(entry.status.to_string())
    .bind(&entry.description)
    .bind(entry.created_at.to_rfc3339())
    .bind(entry.loan_id.map(|l| l.to_string()))
    .bind(entry.receipt_url.clone())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn append_entry(&self, entry: LedgerEntry) -> Result<Uuid, StoreError> {
        insert_entry_tx(&self.pool, &entry).await?;
        Ok(entry.id)
    }

    async fn set_entry_status(&self, id: Uuid, status: EntryStatus) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM ledger_entries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::EntryNotFound(id))?;
        let mut entry = entry_from_row(&row)?;
        entry.transition(status)?;
        sqlx::query("UPDATE ledger_entries SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn entries_for_owner(&self, owner: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM ledger_entries WHERE owner = ? ORDER BY created_at")
            .bind(owner.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn entries_for_scope(&self, scope: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM ledger_entries WHERE scope = ? ORDER BY created_at")
            .bind(scope.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn insert_plan(&self, plan: Plan) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO plans (id, data) VALUES (?, ?)")
            .bind(plan.id.to_string())
            .bind(serde_json::to_string(&plan)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_plan(&self, id: Uuid) -> Result<Plan, StoreError> {
        let row = sqlx::query("SELECT data FROM plans WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::PlanNotFound(id))?;
        let data: String = row.get("data");
        Ok(serde_json::from_str(&data)?)
    }

    async fn insert_subscription(&self, sub: PlanSubscription) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO subscriptions (id, user_id, data) VALUES (?, ?, ?)")
            .bind(sub.id.to_string())
            .bind(sub.user_id.to_string())
            .bind(serde_json::to_string(&sub)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_subscription(&self, id: Uuid) -> Result<PlanSubscription, StoreError> {
        let row = sqlx::query("SELECT data FROM subscriptions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::SubscriptionNotFound(id))?;
        let data: String = row.get("data");
        Ok(serde_json::from_str(&data)?)
    }

    async fn save_subscription(&self, sub: &PlanSubscription) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE subscriptions SET data = ? WHERE id = ?")
            .bind(serde_json::to_string(sub)?)
            .bind(sub.id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SubscriptionNotFound(sub.id));
        }
        Ok(())
    }

    async fn subscriptions_for_user(&self, user: Uuid) -> Result<Vec<PlanSubscription>, StoreError> {
        let rows = sqlx::query("SELECT data FROM subscriptions WHERE user_id = ?")
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await?;
        let mut subs = Vec::with_capacity(rows.len());
        for row in &rows {
            let data: String = row.get("data");
            subs.push(serde_json::from_str::<PlanSubscription>(&data)?);
        }
        subs.sort_by_key(|s| s.started_at);
        Ok(subs)
    }

    async fn insert_loan(&self, loan: Loan) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO loans (id, user_id, data) VALUES (?, ?, ?)")
            .bind(loan.id.to_string())
            .bind(loan.user_id.to_string())
            .bind(serde_json::to_string(&loan)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_loan(&self, loan: &Loan) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE loans SET data = ? WHERE id = ?")
            .bind(serde_json::to_string(loan)?)
            .bind(loan.id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::LoanNotFound(loan.id));
        }
        Ok(())
    }

    async fn loans_for_user(&self, user: Uuid) -> Result<Vec<Loan>, StoreError> {
        let rows = sqlx::query("SELECT data FROM loans WHERE user_id = ?")
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await?;
        let mut loans = Vec::with_capacity(rows.len());
        for row in &rows {
            let data: String = row.get("data");
            loans.push(serde_json::from_str::<Loan>(&data)?);
        }
        loans.sort_by_key(|l| l.created_at);
        Ok(loans)
    }
}

#[async_trait]
impl PlanCredit for SqliteStore {
    async fn apply_plan_credit(
        &self,
        req: PlanCreditRequest,
    ) -> Result<PlanCreditReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT data FROM subscriptions WHERE id = ?")
            .bind(req.subscription.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::SubscriptionNotFound(req.subscription))?;
        let data: String = row.get("data");
        let mut sub: PlanSubscription = serde_json::from_str(&data)?;
        if sub.status != SubscriptionStatus::Active {
            return Err(StoreError::Plan(PlanError::NotActive {
                subscription: sub.id,
                status: sub.status,
            }));
        }

        let plan_row = sqlx::query("SELECT data FROM plans WHERE id = ?")
            .bind(sub.plan_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::PlanNotFound(sub.plan_id))?;
        let plan_data: String = plan_row.get("data");
        let plan: Plan = serde_json::from_str(&plan_data)?;

        let fee = self.engine.contribution_fee(&plan, req.amount);
        let net = req.amount - fee;
        // Cycle units count against the gross contribution; only the
        // balance is credited net of fee.
        let (new_metadata, advance) =
            apply_credit(&sub.metadata, &plan, req.amount, req.now, self.engine.config())?;

        sub.metadata = new_metadata;
        sub.balance += net;

        let entry = LedgerEntryBuilder::new()
            .owner(req.user)
            .scope(req.subscription)
            .kind(EntryKind::Deposit)
            .amount(Amount::new_unchecked(req.amount))
            .fee(Amount::new_unchecked(fee))
            .status(EntryStatus::Completed)
            .description(advance.to_string())
            .created_at(req.now)
            .build()?;

        sqlx::query("UPDATE subscriptions SET data = ? WHERE id = ?")
            .bind(serde_json::to_string(&sub)?)
            .bind(sub.id.to_string())
            .execute(&mut *tx)
            .await?;
        insert_entry_tx(&mut *tx, &entry).await?;

        tx.commit().await?;

        Ok(PlanCreditReceipt {
            entry_id: entry.id,
            fee,
            advance,
            new_balance: sub.balance,
        })
    }
}
