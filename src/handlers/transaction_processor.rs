//! Transaction Processor
//!
//! Applies a deposit, withdrawal, transfer or payment to a single account
//! and appends the matching ledger record, all inside one unit of work.

use crate::domain::{
    identifiers, Amount, DomainError, NewTransactionRecord, OperationContext, TransactionRecord,
    TransactionType,
};
use crate::error::AppError;
use crate::ledger::{LedgerStore, UnitOfWork};

use super::ProcessTransactionCommand;

/// Handler for balance-affecting transactions
///
/// Holds no state besides the store; one `process` call per request.
#[derive(Debug, Clone)]
pub struct TransactionProcessor<S> {
    store: S,
}

impl<S: LedgerStore> TransactionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute the command.
    ///
    /// Validation happens before the store is touched. Everything after that
    /// either commits as a whole or leaves the account and the ledger
    /// unchanged. Storage failures are returned as `AppError::Storage` and are
    /// never retried here.
    pub async fn process(
        &self,
        command: ProcessTransactionCommand,
        context: &OperationContext,
    ) -> Result<TransactionRecord, AppError> {
        let transaction_type: TransactionType = command.transaction_type.parse()?;
        let amount = Amount::new(command.amount).map_err(DomainError::from)?;

        let result = self
            .apply(
                command.account_id,
                transaction_type,
                amount,
                command.description,
                command.reference,
            )
            .await;

        match &result {
            Ok(record) => tracing::info!(
                transaction_id = %record.transaction_id,
                account_id = record.account_id,
                transaction_type = %record.transaction_type,
                amount = %record.amount,
                balance_before = %record.balance_before,
                balance_after = %record.balance_after,
                correlation_id = ?context.correlation_id,
                "Transaction processed"
            ),
            Err(AppError::Domain(e)) => tracing::warn!(
                account_id = command.account_id,
                transaction_type = %transaction_type,
                amount = %amount,
                correlation_id = ?context.correlation_id,
                reason = %e,
                "Transaction rejected"
            ),
            Err(e) => tracing::error!(
                account_id = command.account_id,
                transaction_type = %transaction_type,
                correlation_id = ?context.correlation_id,
                error = %e,
                "Transaction aborted"
            ),
        }

        result
    }

    async fn apply(
        &self,
        account_id: i64,
        transaction_type: TransactionType,
        amount: Amount,
        description: Option<String>,
        reference: Option<String>,
    ) -> Result<TransactionRecord, AppError> {
        let mut unit = self.store.begin().await?;

        let mut account = unit
            .lock_account(account_id)
            .await?
            .ok_or(DomainError::AccountNotFound(account_id))?;

        if !account.is_active() {
            return Err(DomainError::AccountNotActive {
                account_id,
                status: account.status,
            }
            .into());
        }

        let balance_before = account.balance;
        let balance_after = transaction_type.apply(balance_before, &amount)?;
        account.balance = balance_after;

        let record = NewTransactionRecord {
            transaction_id: identifiers::transaction_id(),
            account_id,
            transaction_type,
            amount: amount.value(),
            description,
            reference,
            balance_before,
            balance_after,
        };

        unit.save_account(&account).await?;
        let record = unit.create_transaction_record(record).await?;
        unit.commit().await?;

        Ok(record)
    }
}
