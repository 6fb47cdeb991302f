//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

use super::AccountStatus;

/// Domain-specific errors
///
/// These errors represent request validation failures and business rule
/// violations. They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Transaction type outside {deposit, withdrawal, transfer, payment}
    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    /// Invalid amount (zero, negative, sub-cent or out of range)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    /// Account is not in the active state
    #[error("Account {account_id} is not active (status: {status})")]
    AccountNotActive {
        account_id: i64,
        status: AccountStatus,
    },

    /// Insufficient balance for a debit
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Errors detected before any storage access
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransactionType(_) | Self::InvalidAmount(_)
        )
    }

    /// Errors detected against the stored account state
    pub fn is_precondition_error(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_)
                | Self::AccountNotActive { .. }
                | Self::InsufficientFunds { .. }
        )
    }
}

impl From<super::AmountError> for DomainError {
    fn from(err: super::AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
