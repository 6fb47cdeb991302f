//! Domain module
//!
//! Core domain types and business logic.

pub mod account;
pub mod amount;
pub mod context;
pub mod error;
pub mod identifiers;
pub mod loan;
pub mod transaction;

pub use account::{Account, AccountStatus};
pub use amount::{Amount, AmountError};
pub use context::OperationContext;
pub use error::DomainError;
pub use loan::LoanTerms;
pub use transaction::{NewTransactionRecord, TransactionRecord, TransactionType};
