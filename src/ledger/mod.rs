//! Ledger Store module
//!
//! Transactional persistence for account balances and ledger records.
//! Handles all-or-nothing units of work in PostgreSQL or in memory.

mod error;
pub mod memory;
pub mod postgres;
mod store;

pub use error::{is_data_error_code, StoreError};
pub use memory::{MemoryLedgerStore, MemoryUnitOfWork};
pub use postgres::{PgLedgerStore, PgUnitOfWork};
pub use store::{LedgerStore, UnitOfWork};
