//! Command Handlers module
//!
//! Handlers that orchestrate business operations against the ledger store.

mod commands;
mod transaction_processor;

pub use commands::*;
pub use transaction_processor::TransactionProcessor;
