//! PostgreSQL integration tests
//!
//! Skipped when `DATABASE_URL` is not set.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use core_banking::api::{self, AppState};
use core_banking::domain::DomainError;
use core_banking::handlers::{ProcessTransactionCommand, TransactionProcessor};
use core_banking::ledger::PgLedgerStore;
use core_banking::{AppError, OperationContext};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::util::ServiceExt;

mod common;

fn app(pool: sqlx::PgPool) -> Router {
    api::build_router(AppState::new(pool))
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_processor_commits_balance_and_record() {
    let Some(pool) = common::setup_test_db().await else { return };
    let customer_id = common::seed_customer(&pool).await;
    let account_id = common::seed_account(&pool, customer_id, dec!(100.00), "active").await;

    let processor = TransactionProcessor::new(PgLedgerStore::new(pool.clone()));
    let context = OperationContext::new();

    let record = processor
        .process(ProcessTransactionCommand::new(account_id, "deposit", dec!(50.00)), &context)
        .await
        .unwrap();
    assert_eq!(record.balance_before, dec!(100.00));
    assert_eq!(record.balance_after, dec!(150.00));

    let err = processor
        .process(ProcessTransactionCommand::new(account_id, "withdrawal", dec!(200.00)), &context)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Domain(DomainError::InsufficientFunds { .. })));

    assert_eq!(common::balance_of(&pool, account_id).await, dec!(150.00));
    assert_eq!(common::record_count(&pool, account_id).await, 1);
}

#[tokio::test]
async fn test_processor_rejects_inactive_account() {
    let Some(pool) = common::setup_test_db().await else { return };
    let customer_id = common::seed_customer(&pool).await;
    let account_id = common::seed_account(&pool, customer_id, dec!(0.00), "inactive").await;

    let processor = TransactionProcessor::new(PgLedgerStore::new(pool.clone()));
    let command = ProcessTransactionCommand::new(account_id, "deposit", dec!(10));
    let err = processor
        .process(command, &OperationContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Domain(DomainError::AccountNotActive { .. })));
    assert_eq!(common::balance_of(&pool, account_id).await, dec!(0.00));
    assert_eq!(common::record_count(&pool, account_id).await, 0);
}

#[tokio::test]
async fn test_concurrent_withdrawals_serialize_on_row_lock() {
    let Some(pool) = common::setup_test_db().await else { return };
    let customer_id = common::seed_customer(&pool).await;
    let account_id = common::seed_account(&pool, customer_id, dec!(100.00), "active").await;

    let processor = Arc::new(TransactionProcessor::new(PgLedgerStore::new(pool.clone())));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let processor = Arc::clone(&processor);
            tokio::spawn(async move {
                processor
                    .process(
                        ProcessTransactionCommand::new(account_id, "withdrawal", dec!(30.00)),
                        &OperationContext::new(),
                    )
                    .await
            })
        })
        .collect();

    let successes = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    assert_eq!(successes, 3);
    assert_eq!(common::balance_of(&pool, account_id).await, dec!(10.00));
    assert_eq!(common::record_count(&pool, account_id).await, 3);
}

#[tokio::test]
async fn test_customer_account_transaction_flow() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = app(pool);
    let email = format!("jane-{}@example.com", uuid::Uuid::new_v4());

    let (status, customer) = send(
        &app,
        request(
            "POST",
            "/api/v1/customers",
            Some(json!({"first_name": "Jane", "last_name": "Doe", "email": email})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(customer["status"], "active");
    let customer_id = customer["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v1/customers",
            Some(json!({"first_name": "Jim", "last_name": "Doe", "email": email})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, account) = send(
        &app,
        request(
            "POST",
            "/api/v1/accounts",
            Some(json!({"customer_id": customer_id, "account_type": "checking"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["balance"], "0.00");
    assert_eq!(account["currency"], "USD");
    assert!(account["account_number"].as_str().unwrap().starts_with("ACC"));
    let account_id = account["id"].as_i64().unwrap();

    for amount in ["40.00", "2.50"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/v1/transactions",
                Some(json!({
                    "account_id": account_id,
                    "transaction_type": "deposit",
                    "amount": amount
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, balance) = send(
        &app,
        request("GET", &format!("/api/v1/accounts/{}/balance", account_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance"], "42.50");
    assert_eq!(balance["status"], "active");

    let (status, history) = send(
        &app,
        request("GET", &format!("/api/v1/accounts/{}/transactions", account_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 2);
    assert_eq!(history["transactions"][0]["amount"], "2.50");

    let (status, filtered) = send(
        &app,
        request(
            "GET",
            &format!("/api/v1/transactions?account_id={}&type=withdrawal", account_id),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["total"], 0);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/v1/customers/{}", customer_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = send(
        &app,
        request(
            "PUT",
            &format!("/api/v1/customers/{}", customer_id),
            Some(json!({"phone": "555-0100", "first_name": ""})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "555-0100");
    assert_eq!(updated["first_name"], "Jane");
}

#[tokio::test]
async fn test_delete_customer_without_accounts() {
    let Some(pool) = common::setup_test_db().await else { return };
    let customer_id = common::seed_customer(&pool).await;
    let app = app(pool);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/v1/customers/{}", customer_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/v1/customers/{}", customer_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loan_origination_creates_loan_account() {
    let Some(pool) = common::setup_test_db().await else { return };
    let customer_id = common::seed_customer(&pool).await;
    let app = app(pool);

    let (status, created) = send(
        &app,
        request(
            "POST",
            "/api/v1/loans",
            Some(json!({
                "customer_id": customer_id,
                "principal_amount": "10000.00",
                "interest_rate": "0.06",
                "loan_term": 12
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["loan"]["monthly_payment"], "860.66");
    assert_eq!(created["loan"]["remaining_balance"], "10000.00");
    assert!(created["loan"]["loan_number"].as_str().unwrap().starts_with("LOAN"));

    let (status, customer) = send(
        &app,
        request("GET", &format!("/api/v1/customers/{}", customer_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customer["loans"].as_array().unwrap().len(), 1);
    let accounts = customer["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["account_type"], "loan");
    assert_eq!(accounts[0]["balance"], "-10000.00");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v1/loans",
            Some(json!({
                "customer_id": customer_id,
                "principal_amount": "1000",
                "interest_rate": "0.05",
                "loan_term": 0
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_resources_are_not_found() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = app(pool);

    for uri in [
        "/api/v1/customers/999999999",
        "/api/v1/accounts/999999999",
        "/api/v1/accounts/999999999/balance",
        "/api/v1/loans/999999999",
    ] {
        let (status, _) = send(&app, request("GET", uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v1/accounts",
            Some(json!({"customer_id": 999999999, "account_type": "savings"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_long_reference_is_stored_verbatim() {
    let Some(pool) = common::setup_test_db().await else { return };
    let customer_id = common::seed_customer(&pool).await;
    let account_id = common::seed_account(&pool, customer_id, dec!(0.00), "active").await;
    let app = app(pool.clone());
    let reference = "R".repeat(150);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/transactions",
            Some(json!({
                "account_id": account_id,
                "transaction_type": "deposit",
                "amount": "5.00",
                "reference": reference
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["transaction"]["reference"], reference.as_str());
    assert_eq!(body["transaction"]["balance_before"], "0.00");
    assert_eq!(common::balance_of(&pool, account_id).await, dec!(5.00));
    assert_eq!(common::record_count(&pool, account_id).await, 1);
}

#[tokio::test]
async fn test_oversized_customer_field_is_bad_request() {
    let Some(pool) = common::setup_test_db().await else { return };
    let app = app(pool);
    let email = format!("long-phone-{}@example.com", uuid::Uuid::new_v4());

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/customers",
            Some(json!({
                "first_name": "Jane",
                "last_name": "Doe",
                "email": email,
                "phone": "5".repeat(40)
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["error_code"], "invalid_request");
    assert!(body.get("retryable").is_none());
}
