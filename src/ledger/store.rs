//! Ledger Store contract
//!
//! A store hands out units of work. Everything read or written through a
//! unit becomes visible to other units only on [`UnitOfWork::commit`];
//! dropping a unit without committing rolls it back.

use std::future::Future;

use crate::domain::{Account, NewTransactionRecord, TransactionRecord};

use super::StoreError;

/// Transactional persistence for accounts and ledger records
pub trait LedgerStore: Send + Sync + 'static {
    type Unit: UnitOfWork;

    /// Open a new unit of work
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StoreError>> + Send;
}

/// One all-or-nothing group of ledger reads and writes
pub trait UnitOfWork: Send + 'static {
    /// Fetch an account and hold it exclusively until the unit ends.
    ///
    /// Concurrent units locking the same account are serialized; units on
    /// different accounts never wait on each other.
    fn lock_account(
        &mut self,
        account_id: i64,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Stage the new state of a locked account
    fn save_account(
        &mut self,
        account: &Account,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stage a new ledger record, returning it with storage-assigned fields
    fn create_transaction_record(
        &mut self,
        record: NewTransactionRecord,
    ) -> impl Future<Output = Result<TransactionRecord, StoreError>> + Send;

    /// Make every staged write visible atomically
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
