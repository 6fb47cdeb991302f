//! PostgreSQL Ledger Store
//!
//! Each unit of work is a database transaction. Accounts are locked with
//! `SELECT ... FOR UPDATE`, so read-modify-write on one account row is
//! serialized while other rows stay independent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::amount::to_money;
use crate::domain::{Account, NewTransactionRecord, TransactionRecord, TransactionType};

use super::{LedgerStore, StoreError, UnitOfWork};

/// Column list matching [`AccountRow`]
pub const ACCOUNT_COLUMNS: &str = "id, account_number, customer_id, account_type, balance, \
     currency, status, created_at, updated_at";

/// Column list matching [`TransactionRow`]
pub const TRANSACTION_COLUMNS: &str = "id, transaction_id, account_id, transaction_type, amount, \
     description, reference, balance_before, balance_after, created_at";

pub type AccountRow = (
    i64,
    String,
    i64,
    String,
    Decimal,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

pub type TransactionRow = (
    i64,
    String,
    i64,
    String,
    Decimal,
    Option<String>,
    Option<String>,
    Decimal,
    Decimal,
    DateTime<Utc>,
);

/// Map an `accounts` row into an [`Account`]
pub fn account_from_row(row: AccountRow) -> Result<Account, StoreError> {
    let (
        id,
        account_number,
        customer_id,
        account_type,
        balance,
        currency,
        status,
        created_at,
        updated_at,
    ) = row;
    let status = status.parse().map_err(StoreError::InvalidData)?;

    Ok(Account {
        id,
        account_number,
        customer_id,
        account_type,
        balance: to_money(balance),
        currency,
        status,
        created_at,
        updated_at,
    })
}

/// Map a `transactions` row into a [`TransactionRecord`]
pub fn transaction_from_row(row: TransactionRow) -> Result<TransactionRecord, StoreError> {
    let (
        id,
        transaction_id,
        account_id,
        transaction_type,
        amount,
        description,
        reference,
        balance_before,
        balance_after,
        created_at,
    ) = row;
    let transaction_type: TransactionType = transaction_type
        .parse()
        .map_err(|e: crate::domain::DomainError| StoreError::InvalidData(e.to_string()))?;

    Ok(TransactionRecord {
        id,
        transaction_id,
        account_id,
        transaction_type,
        amount: to_money(amount),
        description,
        reference,
        balance_before: to_money(balance_before),
        balance_after: to_money(balance_after),
        created_at,
    })
}

/// Ledger store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new store with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LedgerStore for PgLedgerStore {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// A database transaction; rolled back by sqlx when dropped uncommitted
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork for PgUnitOfWork {
    async fn lock_account(&mut self, account_id: i64) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM accounts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            ACCOUNT_COLUMNS
        );

        let row: Option<AccountRow> = sqlx::query_as(&query)
            .bind(account_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(account_from_row).transpose()
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account.id)
        .bind(account.balance)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::from_write)?
        .rows_affected();

        if rows_affected != 1 {
            return Err(StoreError::Conflict(format!(
                "account {} disappeared during update",
                account.id
            )));
        }

        Ok(())
    }

    async fn create_transaction_record(
        &mut self,
        record: NewTransactionRecord,
    ) -> Result<TransactionRecord, StoreError> {
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO transactions (
                transaction_id, account_id, transaction_type, amount,
                description, reference, balance_before, balance_after
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, created_at
            "#,
        )
        .bind(&record.transaction_id)
        .bind(record.account_id)
        .bind(record.transaction_type.as_str())
        .bind(record.amount)
        .bind(&record.description)
        .bind(&record.reference)
        .bind(record.balance_before)
        .bind(record.balance_after)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::from_write)?;

        Ok(TransactionRecord::from_new(id, created_at, record))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
