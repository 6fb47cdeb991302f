//! Core banking record service
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod ledger;
mod error;

pub use config::{Config, LogFormat};
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{Account, AccountStatus, Amount, AmountError, DomainError, OperationContext};
pub use domain::{TransactionRecord, TransactionType};
