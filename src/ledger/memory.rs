//! In-memory Ledger Store
//!
//! Keeps every account behind its own async mutex. A unit of work holds the
//! account's guard from `lock_account` until it is committed or dropped, and
//! stages writes locally so that an abandoned unit leaves no trace.
//!
//! Used by the test suites and for running the processor without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{Account, NewTransactionRecord, TransactionRecord};

use super::{LedgerStore, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct Inner {
    accounts: Mutex<HashMap<i64, Arc<AsyncMutex<Account>>>>,
    records: Mutex<Vec<TransactionRecord>>,
    last_record_id: AtomicI64,
    fail_next_record_write: AtomicBool,
    fail_next_commit: AtomicBool,
}

impl Inner {
    fn slot(&self, account_id: i64) -> Option<Arc<AsyncMutex<Account>>> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.get(&account_id).cloned()
    }

    fn has_transaction_id(&self, transaction_id: &str) -> bool {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().any(|r| r.transaction_id == transaction_id)
    }
}

/// Ledger store holding accounts and records in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account
    pub fn insert_account(&self, account: Account) {
        let mut accounts = self.inner.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.insert(account.id, Arc::new(AsyncMutex::new(account)));
    }

    /// Read the committed state of an account, waiting for any unit holding it
    pub async fn account(&self, account_id: i64) -> Option<Account> {
        let slot = self.inner.slot(account_id)?;
        let account = slot.lock().await.clone();
        Some(account)
    }

    /// All committed records, in commit order
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.inner
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Committed records of one account, in commit order
    pub fn records_for(&self, account_id: i64) -> Vec<TransactionRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.account_id == account_id)
            .collect()
    }

    /// Make the next `create_transaction_record` call fail
    pub fn fail_next_record_write(&self) {
        self.inner.fail_next_record_write.store(true, Ordering::SeqCst);
    }

    /// Make the next `commit` call fail
    pub fn fail_next_commit(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl LedgerStore for MemoryLedgerStore {
    type Unit = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, StoreError> {
        Ok(MemoryUnitOfWork {
            inner: Arc::clone(&self.inner),
            locked: None,
            staged_account: None,
            staged_record: None,
        })
    }
}

/// Unit of work over [`MemoryLedgerStore`]; locks at most one account
pub struct MemoryUnitOfWork {
    inner: Arc<Inner>,
    locked: Option<OwnedMutexGuard<Account>>,
    staged_account: Option<Account>,
    staged_record: Option<TransactionRecord>,
}

impl MemoryUnitOfWork {
    fn locked_id(&self) -> Option<i64> {
        self.locked.as_ref().map(|guard| guard.id)
    }
}

impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_account(&mut self, account_id: i64) -> Result<Option<Account>, StoreError> {
        match self.locked_id() {
            Some(id) if id == account_id => {
                let current = self.staged_account.clone();
                return Ok(current.or_else(|| self.locked.as_ref().map(|g| (**g).clone())));
            }
            Some(id) => {
                return Err(StoreError::Unavailable(format!(
                    "unit of work already holds account {}",
                    id
                )));
            }
            None => {}
        }

        let Some(slot) = self.inner.slot(account_id) else {
            return Ok(None);
        };

        let guard = slot.lock_owned().await;
        let account = (*guard).clone();
        self.locked = Some(guard);

        Ok(Some(account))
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if self.locked_id() != Some(account.id) {
            return Err(StoreError::Conflict(format!(
                "account {} must be locked before it is saved",
                account.id
            )));
        }

        let mut updated = account.clone();
        updated.updated_at = Utc::now();
        self.staged_account = Some(updated);
        Ok(())
    }

    async fn create_transaction_record(
        &mut self,
        record: NewTransactionRecord,
    ) -> Result<TransactionRecord, StoreError> {
        if self.inner.fail_next_record_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("record write failed".to_string()));
        }

        if self.inner.has_transaction_id(&record.transaction_id) {
            return Err(StoreError::Conflict(format!(
                "duplicate transaction_id {}",
                record.transaction_id
            )));
        }

        let id = self.inner.last_record_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = TransactionRecord::from_new(id, Utc::now(), record);
        self.staged_record = Some(created.clone());
        Ok(created)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }

        // Record and balance are published while the account guard is held,
        // so the next unit on this account sees both or neither.
        {
            let mut records = self.inner.records.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(record) = self.staged_record.take() {
                if records.iter().any(|r| r.transaction_id == record.transaction_id) {
                    return Err(StoreError::Conflict(format!(
                        "duplicate transaction_id {}",
                        record.transaction_id
                    )));
                }
                records.push(record);
            }
        }

        if let (Some(guard), Some(account)) = (self.locked.as_mut(), self.staged_account.take()) {
            **guard = account;
        }

        Ok(())
    }
}
