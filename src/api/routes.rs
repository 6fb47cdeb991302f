//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, FromRef, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::domain::amount::to_money;
use crate::domain::{
    identifiers, Account, AccountStatus, LoanTerms, OperationContext, TransactionRecord,
    TransactionType,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{ProcessTransactionCommand, TransactionProcessor};
use crate::ledger::postgres::{
    account_from_row, transaction_from_row, AccountRow, TransactionRow, ACCOUNT_COLUMNS,
    TRANSACTION_COLUMNS,
};
use crate::ledger::{LedgerStore, PgLedgerStore, StoreError};

// =========================================================================
// Application state
// =========================================================================

/// Shared state for the API router
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub processor: Arc<TransactionProcessor<PgLedgerStore>>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let processor = TransactionProcessor::new(PgLedgerStore::new(pool.clone()));
        Self {
            pool,
            processor: Arc::new(processor),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<TransactionProcessor<PgLedgerStore>> {
    fn from_ref(state: &AppState) -> Self {
        state.processor.clone()
    }
}

// =========================================================================
// Pagination
// =========================================================================

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    pub fn resolve(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Self {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomerRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetailResponse {
    #[serde(flatten)]
    pub customer: CustomerResponse,
    pub accounts: Vec<Account>,
    pub loans: Vec<LoanResponse>,
}

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub customer_id: i64,
    pub account_type: String,
}

#[derive(Debug, Serialize)]
pub struct AccountListResponse {
    pub accounts: Vec<Account>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: i64,
    pub account_number: String,
    pub balance: Decimal,
    pub currency: String,
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub account_id: i64,
    pub transaction_type: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionCreatedResponse {
    pub message: String,
    pub transaction: TransactionRecord,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionRecord>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub customer_id: i64,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub loan_term: i32,
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: i64,
    pub loan_number: String,
    pub customer_id: i64,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub loan_term: i32,
    pub status: String,
    pub remaining_balance: Decimal,
    pub monthly_payment: Decimal,
    pub disbursement_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LoanCreatedResponse {
    pub message: String,
    pub loan: LoanResponse,
}

#[derive(Debug, Serialize)]
pub struct LoanListResponse {
    pub loans: Vec<LoanResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// =========================================================================
// Row mapping
// =========================================================================

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, address, \
     date_of_birth, status, created_at, updated_at";

type CustomerRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<NaiveDate>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn customer_from_row(row: CustomerRow) -> CustomerResponse {
    let (
        id,
        first_name,
        last_name,
        email,
        phone,
        address,
        date_of_birth,
        status,
        created_at,
        updated_at,
    ) = row;
    CustomerResponse {
        id,
        first_name,
        last_name,
        email,
        phone,
        address,
        date_of_birth,
        status,
        created_at,
        updated_at,
    }
}

const LOAN_COLUMNS: &str = "id, loan_number, customer_id, principal_amount, interest_rate, \
     loan_term, status, remaining_balance, monthly_payment, disbursement_date, due_date, \
     created_at, updated_at";

type LoanRow = (
    i64,
    String,
    i64,
    Decimal,
    Decimal,
    i32,
    String,
    Decimal,
    Decimal,
    NaiveDate,
    NaiveDate,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn loan_from_row(row: LoanRow) -> LoanResponse {
    let (
        id,
        loan_number,
        customer_id,
        principal_amount,
        interest_rate,
        loan_term,
        status,
        remaining_balance,
        monthly_payment,
        disbursement_date,
        due_date,
        created_at,
        updated_at,
    ) = row;

    LoanResponse {
        id,
        loan_number,
        customer_id,
        principal_amount: to_money(principal_amount),
        interest_rate,
        loan_term,
        status,
        remaining_balance: to_money(remaining_balance),
        monthly_payment: to_money(monthly_payment),
        disbursement_date,
        due_date,
        created_at,
        updated_at,
    }
}

fn accounts_from_rows(rows: Vec<AccountRow>) -> AppResult<Vec<Account>> {
    rows.into_iter()
        .map(|row| account_from_row(row).map_err(AppError::from))
        .collect()
}

fn transactions_from_rows(rows: Vec<TransactionRow>) -> AppResult<Vec<TransactionRecord>> {
    rows.into_iter()
        .map(|row| transaction_from_row(row).map_err(AppError::from))
        .collect()
}

// =========================================================================
// Helpers
// =========================================================================

/// Unwrap a JSON body, reporting malformed input as a 400
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

fn required(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn customer_write_error(err: sqlx::Error) -> AppError {
    match StoreError::from_write(err) {
        StoreError::Conflict(_) => {
            AppError::Conflict("a customer with this email already exists".to_string())
        }
        StoreError::Rejected(msg) => AppError::InvalidRequest(msg),
        StoreError::Database(e) => AppError::Database(e),
        other => AppError::Storage(other),
    }
}

async fn customer_exists(pool: &PgPool, customer_id: i64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM customers WHERE id = $1 AND deleted_at IS NULL)",
    )
    .bind(customer_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

async fn fetch_account(pool: &PgPool, account_id: i64) -> AppResult<Account> {
    let query = format!(
        "SELECT {} FROM accounts WHERE id = $1 AND deleted_at IS NULL",
        ACCOUNT_COLUMNS
    );

    let row: Option<AccountRow> = sqlx::query_as(&query)
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

    let row = row.ok_or_else(|| AppError::NotFound("Account".to_string()))?;
    Ok(account_from_row(row)?)
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Customers
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        // Accounts
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/balance", get(get_account_balance))
        .route("/accounts/:id/transactions", get(get_account_transactions))
        // Transactions
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction::<PgLedgerStore>),
        )
        // Loans
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/:id", get(get_loan))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "core-banking",
    })
}

// =========================================================================
// GET /customers
// =========================================================================

async fn list_customers(
    State(pool): State<PgPool>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<CustomerListResponse>> {
    let window = PageWindow::resolve(query.page, query.limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE deleted_at IS NULL")
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        "SELECT {} FROM customers WHERE deleted_at IS NULL ORDER BY id LIMIT $1 OFFSET $2",
        CUSTOMER_COLUMNS
    );
    let rows: Vec<CustomerRow> = sqlx::query_as(&sql)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&pool)
        .await?;

    Ok(Json(CustomerListResponse {
        customers: rows.into_iter().map(customer_from_row).collect(),
        total,
        page: window.page,
        limit: window.limit,
    }))
}

// =========================================================================
// GET /customers/:id
// =========================================================================

/// Customer with their accounts and loans
async fn get_customer(
    State(pool): State<PgPool>,
    Path(customer_id): Path<i64>,
) -> AppResult<Json<CustomerDetailResponse>> {
    let sql = format!(
        "SELECT {} FROM customers WHERE id = $1 AND deleted_at IS NULL",
        CUSTOMER_COLUMNS
    );
    let row: Option<CustomerRow> = sqlx::query_as(&sql)
        .bind(customer_id)
        .fetch_optional(&pool)
        .await?;
    let row = row.ok_or_else(|| AppError::NotFound("Customer".to_string()))?;
    let customer = customer_from_row(row);

    let sql = format!(
        "SELECT {} FROM accounts WHERE customer_id = $1 AND deleted_at IS NULL ORDER BY id",
        ACCOUNT_COLUMNS
    );
    let account_rows: Vec<AccountRow> = sqlx::query_as(&sql)
        .bind(customer_id)
        .fetch_all(&pool)
        .await?;

    let sql = format!(
        "SELECT {} FROM loans WHERE customer_id = $1 AND deleted_at IS NULL ORDER BY id",
        LOAN_COLUMNS
    );
    let loan_rows: Vec<LoanRow> = sqlx::query_as(&sql)
        .bind(customer_id)
        .fetch_all(&pool)
        .await?;

    Ok(Json(CustomerDetailResponse {
        customer,
        accounts: accounts_from_rows(account_rows)?,
        loans: loan_rows.into_iter().map(loan_from_row).collect(),
    }))
}

// =========================================================================
// POST /customers
// =========================================================================

async fn create_customer(
    State(pool): State<PgPool>,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CustomerResponse>)> {
    let request = json_body(payload)?;

    required("first_name", &request.first_name)?;
    required("last_name", &request.last_name)?;
    required("email", &request.email)?;
    if !request.email.contains('@') {
        return Err(AppError::InvalidRequest("email is not valid".to_string()));
    }

    let sql = format!(
        r#"
        INSERT INTO customers (first_name, last_name, email, phone, address, date_of_birth, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'active')
        RETURNING {}
        "#,
        CUSTOMER_COLUMNS
    );
    let row: CustomerRow = sqlx::query_as(&sql)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.email.trim())
        .bind(non_empty(request.phone))
        .bind(non_empty(request.address))
        .bind(request.date_of_birth)
        .fetch_one(&pool)
        .await
        .map_err(customer_write_error)?;

    let customer = customer_from_row(row);
    tracing::info!(customer_id = customer.id, "Customer created");

    Ok((StatusCode::CREATED, Json(customer)))
}

// =========================================================================
// PUT /customers/:id
// =========================================================================

/// Update the non-empty fields of a customer
async fn update_customer(
    State(pool): State<PgPool>,
    Path(customer_id): Path<i64>,
    payload: Result<Json<UpdateCustomerRequest>, JsonRejection>,
) -> AppResult<Json<CustomerResponse>> {
    let request = json_body(payload)?;

    let status = non_empty(request.status);
    if let Some(status) = &status {
        if status != "active" && status != "inactive" {
            return Err(AppError::InvalidRequest(format!(
                "customer status must be active or inactive (got {})",
                status
            )));
        }
    }

    let email = non_empty(request.email);
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        return Err(AppError::InvalidRequest("email is not valid".to_string()));
    }

    let sql = format!(
        r#"
        UPDATE customers SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            address = COALESCE($6, address),
            date_of_birth = COALESCE($7, date_of_birth),
            status = COALESCE($8, status),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING {}
        "#,
        CUSTOMER_COLUMNS
    );
    let row: Option<CustomerRow> = sqlx::query_as(&sql)
        .bind(customer_id)
        .bind(non_empty(request.first_name))
        .bind(non_empty(request.last_name))
        .bind(email)
        .bind(non_empty(request.phone))
        .bind(non_empty(request.address))
        .bind(request.date_of_birth)
        .bind(status)
        .fetch_optional(&pool)
        .await
        .map_err(customer_write_error)?;

    let row = row.ok_or_else(|| AppError::NotFound("Customer".to_string()))?;
    Ok(Json(customer_from_row(row)))
}

// =========================================================================
// DELETE /customers/:id
// =========================================================================

/// Soft delete a customer without active accounts
async fn delete_customer(
    State(pool): State<PgPool>,
    Path(customer_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    if !customer_exists(&pool, customer_id).await? {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    let active_accounts: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM accounts
        WHERE customer_id = $1 AND status = 'active' AND deleted_at IS NULL
        "#,
    )
    .bind(customer_id)
    .fetch_one(&pool)
    .await?;

    if active_accounts > 0 {
        return Err(AppError::Conflict(
            "cannot delete a customer with active accounts".to_string(),
        ));
    }

    let rows_affected = sqlx::query(
        r#"
        UPDATE customers SET deleted_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(customer_id)
    .execute(&pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    tracing::info!(customer_id, "Customer deleted");

    Ok(Json(MessageResponse {
        message: "Customer deleted successfully".to_string(),
    }))
}

// =========================================================================
// GET /accounts
// =========================================================================

async fn list_accounts(
    State(pool): State<PgPool>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<AccountListResponse>> {
    let window = PageWindow::resolve(query.page, query.limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE deleted_at IS NULL")
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        "SELECT {} FROM accounts WHERE deleted_at IS NULL ORDER BY id LIMIT $1 OFFSET $2",
        ACCOUNT_COLUMNS
    );
    let rows: Vec<AccountRow> = sqlx::query_as(&sql)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&pool)
        .await?;

    Ok(Json(AccountListResponse {
        accounts: accounts_from_rows(rows)?,
        total,
        page: window.page,
        limit: window.limit,
    }))
}

// =========================================================================
// GET /accounts/:id
// =========================================================================

async fn get_account(
    State(pool): State<PgPool>,
    Path(account_id): Path<i64>,
) -> AppResult<Json<Account>> {
    Ok(Json(fetch_account(&pool, account_id).await?))
}

// =========================================================================
// POST /accounts
// =========================================================================

const ACCOUNT_TYPES: &[&str] = &["checking", "savings", "loan"];

/// Open an account with a zero balance
async fn create_account(
    State(pool): State<PgPool>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Account>)> {
    let request = json_body(payload)?;

    if !ACCOUNT_TYPES.contains(&request.account_type.as_str()) {
        return Err(AppError::InvalidRequest(format!(
            "account_type must be one of {} (got {})",
            ACCOUNT_TYPES.join(", "),
            request.account_type
        )));
    }

    if !customer_exists(&pool, request.customer_id).await? {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    let sql = format!(
        r#"
        INSERT INTO accounts (account_number, customer_id, account_type, balance, currency, status)
        VALUES ($1, $2, $3, 0.00, 'USD', 'active')
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    );
    let row: AccountRow = sqlx::query_as(&sql)
        .bind(identifiers::account_number())
        .bind(request.customer_id)
        .bind(&request.account_type)
        .fetch_one(&pool)
        .await
        .map_err(StoreError::from_write)?;

    let account = account_from_row(row)?;
    tracing::info!(
        account_id = account.id,
        account_number = %account.account_number,
        customer_id = account.customer_id,
        "Account opened"
    );

    Ok((StatusCode::CREATED, Json(account)))
}

// =========================================================================
// GET /accounts/:id/balance
// =========================================================================

async fn get_account_balance(
    State(pool): State<PgPool>,
    Path(account_id): Path<i64>,
) -> AppResult<Json<BalanceResponse>> {
    let account = fetch_account(&pool, account_id).await?;

    Ok(Json(BalanceResponse {
        account_id: account.id,
        account_number: account.account_number,
        balance: account.balance,
        currency: account.currency,
        status: account.status,
    }))
}

// =========================================================================
// GET /accounts/:id/transactions
// =========================================================================

/// Ledger records of one account, newest first
async fn get_account_transactions(
    State(pool): State<PgPool>,
    Path(account_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<TransactionListResponse>> {
    fetch_account(&pool, account_id).await?;

    let filter = TransactionsQuery {
        account_id: Some(account_id),
        page: query.page,
        limit: query.limit,
        ..Default::default()
    };

    query_transactions(&pool, filter).await.map(Json)
}

// =========================================================================
// GET /transactions
// =========================================================================

async fn list_transactions(
    State(pool): State<PgPool>,
    Query(query): Query<TransactionsQuery>,
) -> AppResult<Json<TransactionListResponse>> {
    query_transactions(&pool, query).await.map(Json)
}

async fn query_transactions(
    pool: &PgPool,
    query: TransactionsQuery,
) -> AppResult<TransactionListResponse> {
    let window = PageWindow::resolve(query.page, query.limit);

    let transaction_type = query
        .transaction_type
        .as_deref()
        .map(str::parse::<TransactionType>)
        .transpose()?;
    let transaction_type = transaction_type.map(|t| t.as_str());

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM transactions
        WHERE ($1::BIGINT IS NULL OR account_id = $1)
          AND ($2::TEXT IS NULL OR transaction_type = $2)
        "#,
    )
    .bind(query.account_id)
    .bind(transaction_type)
    .fetch_one(pool)
    .await?;

    let sql = format!(
        r#"
        SELECT {} FROM transactions
        WHERE ($1::BIGINT IS NULL OR account_id = $1)
          AND ($2::TEXT IS NULL OR transaction_type = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
        TRANSACTION_COLUMNS
    );
    let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
        .bind(query.account_id)
        .bind(transaction_type)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(pool)
        .await?;

    Ok(TransactionListResponse {
        transactions: transactions_from_rows(rows)?,
        total,
        page: window.page,
        limit: window.limit,
    })
}

// =========================================================================
// POST /transactions
// =========================================================================

/// Apply a transaction to one account
pub async fn create_transaction<S: LedgerStore>(
    State(processor): State<Arc<TransactionProcessor<S>>>,
    context: Option<Extension<OperationContext>>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TransactionCreatedResponse>)> {
    let request = json_body(payload)?;
    let context = context.map(|Extension(ctx)| ctx).unwrap_or_default();

    let mut command = ProcessTransactionCommand::new(
        request.account_id,
        request.transaction_type,
        request.amount,
    );
    if let Some(description) = request.description {
        command = command.with_description(description);
    }
    if let Some(reference) = request.reference {
        command = command.with_reference(reference);
    }

    let transaction = processor.process(command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionCreatedResponse {
            message: "Transaction processed successfully".to_string(),
            transaction,
        }),
    ))
}

// =========================================================================
// GET /loans
// =========================================================================

async fn list_loans(
    State(pool): State<PgPool>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<LoanListResponse>> {
    let window = PageWindow::resolve(query.page, query.limit);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE deleted_at IS NULL")
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        "SELECT {} FROM loans WHERE deleted_at IS NULL ORDER BY id LIMIT $1 OFFSET $2",
        LOAN_COLUMNS
    );
    let rows: Vec<LoanRow> = sqlx::query_as(&sql)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&pool)
        .await?;

    Ok(Json(LoanListResponse {
        loans: rows.into_iter().map(loan_from_row).collect(),
        total,
        page: window.page,
        limit: window.limit,
    }))
}

// =========================================================================
// GET /loans/:id
// =========================================================================

async fn get_loan(
    State(pool): State<PgPool>,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<LoanResponse>> {
    let sql = format!(
        "SELECT {} FROM loans WHERE id = $1 AND deleted_at IS NULL",
        LOAN_COLUMNS
    );
    let row: Option<LoanRow> = sqlx::query_as(&sql)
        .bind(loan_id)
        .fetch_optional(&pool)
        .await?;

    let row = row.ok_or_else(|| AppError::NotFound("Loan".to_string()))?;
    Ok(Json(loan_from_row(row)))
}

// =========================================================================
// POST /loans
// =========================================================================

/// Originate a loan and its companion loan account
async fn create_loan(
    State(pool): State<PgPool>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<LoanCreatedResponse>)> {
    let request = json_body(payload)?;

    if !customer_exists(&pool, request.customer_id).await? {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    let terms = LoanTerms::new(request.principal_amount, request.interest_rate, request.loan_term)?;
    let principal = terms.principal.value();
    let monthly_payment = terms.monthly_payment();

    let disbursement_date = Utc::now().date_naive();
    let due_date = terms
        .due_date(disbursement_date)
        .ok_or_else(|| {
            AppError::InvalidRequest("loan term exceeds the calendar range".to_string())
        })?;

    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO loans (
            loan_number, customer_id, principal_amount, interest_rate, loan_term, status,
            remaining_balance, monthly_payment, disbursement_date, due_date
        )
        VALUES ($1, $2, $3, $4, $5, 'active', $3, $6, $7, $8)
        RETURNING {}
        "#,
        LOAN_COLUMNS
    );
    let row: LoanRow = sqlx::query_as(&sql)
        .bind(identifiers::loan_number())
        .bind(request.customer_id)
        .bind(principal)
        .bind(terms.annual_rate)
        .bind(request.loan_term)
        .bind(monthly_payment)
        .bind(disbursement_date)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_write)?;

    sqlx::query(
        r#"
        INSERT INTO accounts (account_number, customer_id, account_type, balance, currency, status)
        VALUES ($1, $2, 'loan', $3, 'USD', 'active')
        "#,
    )
    .bind(identifiers::account_number())
    .bind(request.customer_id)
    .bind(-principal)
    .execute(&mut *tx)
    .await
    .map_err(StoreError::from_write)?;

    tx.commit().await?;

    let loan = loan_from_row(row);
    tracing::info!(
        loan_id = loan.id,
        loan_number = %loan.loan_number,
        customer_id = loan.customer_id,
        principal = %loan.principal_amount,
        monthly_payment = %loan.monthly_payment,
        "Loan originated"
    );

    Ok((
        StatusCode::CREATED,
        Json(LoanCreatedResponse {
            message: "Loan created successfully".to_string(),
            loan,
        }),
    ))
}
