//! Common test utilities

#![allow(dead_code)]

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

const SCHEMA: &str = include_str!("../../migrations/0001_core_banking.sql");

/// Connect to the test database and apply the schema.
///
/// Returns `None` when `DATABASE_URL` is unset so the calling test can skip.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    // Serialize schema creation between concurrently starting tests
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    (&mut *conn).execute("SELECT pg_advisory_lock(7411)")
        .await
        .expect("Failed to take schema lock");
    (&mut *conn).execute(SCHEMA).await.expect("Failed to apply schema");
    (&mut *conn).execute("SELECT pg_advisory_unlock(7411)")
        .await
        .expect("Failed to release schema lock");
    drop(conn);

    Some(pool)
}

/// Insert a customer with a unique email, returning its id
pub async fn seed_customer(pool: &PgPool) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO customers (first_name, last_name, email, status)
        VALUES ('Test', 'Customer', $1, 'active')
        RETURNING id
        "#,
    )
    .bind(format!("test-{}@example.com", uuid::Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("Failed to seed customer")
}

/// Insert an account for `customer_id`, returning its id
pub async fn seed_account(pool: &PgPool, customer_id: i64, balance: Decimal, status: &str) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO accounts (account_number, customer_id, account_type, balance, currency, status)
        VALUES ($1, $2, 'checking', $3, 'USD', $4)
        RETURNING id
        "#,
    )
    .bind(core_banking::domain::identifiers::account_number())
    .bind(customer_id)
    .bind(balance)
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("Failed to seed account")
}

/// Current stored balance of an account
pub async fn balance_of(pool: &PgPool, account_id: i64) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// Number of ledger records for an account
pub async fn record_count(pool: &PgPool, account_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count records")
}
