//! PostgreSQL ledger store
//!
//! Row-level pessimistic locking: a unit of work is an open SQL transaction
//! that has run `SELECT … FOR UPDATE` on the account row. The balance update
//! and the transaction insert run inside that SQL transaction and are made
//! visible together by `COMMIT`. Dropping the unit of work drops the
//! `sqlx::Transaction`, which rolls it back.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};

use super::traits::{validate_seed, LedgerStore, UnitOfWork};
use crate::types::{
    Account, AccountBalance, AccountId, AccountSeed, LedgerEntry, LedgerError, Transaction,
    TransactionKind,
};

/// SQLSTATE raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id            INTEGER PRIMARY KEY,
    name          VARCHAR(50) NOT NULL,
    balance       BIGINT NOT NULL DEFAULT 0,
    balance_limit BIGINT NOT NULL CHECK (balance_limit >= 0),
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS transactions (
    id          BIGSERIAL PRIMARY KEY,
    account_id  INTEGER NOT NULL REFERENCES accounts (id),
    amount      BIGINT NOT NULL CHECK (amount > 0),
    kind        CHAR(1) NOT NULL CHECK (kind IN ('c', 'd')),
    description VARCHAR(10) NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_transactions_account_recent
    ON transactions (account_id, created_at DESC, id DESC);
"#;

/// Connection settings for the PostgreSQL store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseSettings {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    /// Build settings from the environment
    ///
    /// `DATABASE_URL` wins when set. Otherwise the URL is assembled from
    /// `DB_USER`, `DB_PASS`, `DB_HOSTNAME`, `DB_PORT` and `DB_NAME`, each with
    /// the defaults the service has always shipped with.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            return Self::new(&url);
        }

        let get = |key: &str, fallback: &str| lookup(key).unwrap_or_else(|| fallback.to_string());
        let url = format!(
            "postgres://{}:{}@{}:{}/{}",
            get("DB_USER", "admin"),
            get("DB_PASS", "123"),
            get("DB_HOSTNAME", "localhost"),
            get("DB_PORT", "5432"),
            get("DB_NAME", "rinha-db"),
        );
        Self::new(&url)
    }
}

/// Ledger store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresLedgerStore {
    /// Open a connection pool
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await?;

        tracing::info!(max_connections = settings.max_connections, "PostgreSQL connection pool established");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bound the time a unit of work waits for a row lock
    ///
    /// Enforced by the server (`SET LOCAL lock_timeout`), so a caller whose
    /// deadline expires leaves no session behind still queued on the row.
    pub fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Create the tables and the recent-activity index if missing
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::debug!("Ledger schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn lock_error(&self, account_id: AccountId, error: sqlx::Error) -> LedgerError {
        let lock_expired = error
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == LOCK_NOT_AVAILABLE);

        match (lock_expired, self.lock_timeout) {
            (true, Some(waited)) => LedgerError::lock_timeout(account_id, waited.as_millis() as u64),
            _ => error.into(),
        }
    }
}

fn parse_kind(code: &str) -> Result<TransactionKind, LedgerError> {
    TransactionKind::from_code(code.trim())
        .map_err(|_| LedgerError::store_unavailable(format!("corrupt transaction kind '{}'", code)))
}

fn transaction_from_row(account_id: AccountId, row: &PgRow) -> Result<Option<Transaction>, LedgerError> {
    let id: Option<i64> = row.try_get("tx_id")?;
    let Some(id) = id else {
        return Ok(None);
    };

    let kind: String = row.try_get("kind")?;
    Ok(Some(Transaction {
        id,
        account_id,
        amount: row.try_get("amount")?,
        kind: parse_kind(&kind)?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    }))
}

impl LedgerStore for PostgresLedgerStore {
    type Unit = PostgresUnitOfWork;

    async fn lock_account_for_update(
        &self,
        account_id: AccountId,
    ) -> Result<PostgresUnitOfWork, LedgerError> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.lock_timeout {
            // SET does not accept bind parameters
            sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query("SELECT balance, balance_limit FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| self.lock_error(account_id, e))?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(LedgerError::account_not_found(account_id));
        };

        let current = AccountBalance::new(row.try_get("balance")?, row.try_get("balance_limit")?);
        Ok(PostgresUnitOfWork {
            account_id,
            tx,
            current,
        })
    }

    async fn recent_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let (_, transactions) = self.statement_snapshot(account_id, limit).await?;
        Ok(transactions)
    }

    async fn statement_snapshot(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<(AccountBalance, Vec<Transaction>), LedgerError> {
        // One statement, one snapshot: the account row and its latest
        // transactions come from the same MVCC view.
        let rows = sqlx::query(
            r#"
            SELECT a.balance, a.balance_limit,
                   t.id AS tx_id, t.amount, t.kind, t.description, t.created_at
            FROM accounts a
            LEFT JOIN LATERAL (
                SELECT id, amount, kind, description, created_at
                FROM transactions
                WHERE account_id = a.id
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) t ON true
            WHERE a.id = $1
            ORDER BY t.created_at DESC NULLS LAST, t.id DESC NULLS LAST
            "#,
        )
        .bind(account_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let Some(first) = rows.first() else {
            return Err(LedgerError::account_not_found(account_id));
        };

        let balance = AccountBalance::new(first.try_get("balance")?, first.try_get("balance_limit")?);
        let mut transactions = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(transaction) = transaction_from_row(account_id, row)? {
                transactions.push(transaction);
            }
        }

        Ok((balance, transactions))
    }

    async fn seed_account(&self, seed: &AccountSeed) -> Result<(), LedgerError> {
        validate_seed(seed)?;

        let result = sqlx::query(
            "INSERT INTO accounts (id, name, balance, balance_limit) VALUES ($1, $2, $3, $4)",
        )
        .bind(seed.id)
        .bind(seed.name.as_str())
        .bind(seed.balance)
        .bind(seed.balance_limit)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(account = seed.id, limit = seed.balance_limit, "Account seeded");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(LedgerError::duplicate_account(seed.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let rows = sqlx::query("SELECT id, name, balance, balance_limit FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Account, LedgerError> {
                Ok(Account {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    balance: row.try_get("balance")?,
                    balance_limit: row.try_get("balance_limit")?,
                })
            })
            .collect()
    }
}

/// Open SQL transaction holding `FOR UPDATE` on one account row
#[derive(Debug)]
pub struct PostgresUnitOfWork {
    account_id: AccountId,
    tx: sqlx::Transaction<'static, Postgres>,
    current: AccountBalance,
}

impl UnitOfWork for PostgresUnitOfWork {
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn current(&self) -> AccountBalance {
        self.current
    }

    async fn write_balance(&mut self, new_balance: i64) -> Result<AccountBalance, LedgerError> {
        let row = sqlx::query(
            "UPDATE accounts SET balance = $1 WHERE id = $2 RETURNING balance, balance_limit",
        )
        .bind(new_balance)
        .bind(self.account_id)
        .fetch_one(&mut *self.tx)
        .await?;

        self.current = AccountBalance::new(row.try_get("balance")?, row.try_get("balance_limit")?);
        Ok(self.current)
    }

    async fn append_transaction(
        &mut self,
        entry: &LedgerEntry,
        created_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO transactions (account_id, amount, kind, description, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(self.account_id)
        .bind(entry.amount.get())
        .bind(entry.kind.code())
        .bind(entry.description.as_str())
        .bind(created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
