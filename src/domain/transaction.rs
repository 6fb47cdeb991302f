//! Transaction types and ledger records
//!
//! The balance effect table lives here; everything that computes a new
//! balance goes through [`TransactionType::apply`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::amount::{fits_money_range, to_money};
use super::{Amount, DomainError};

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Transfer,
        TransactionType::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
            TransactionType::Payment => "payment",
        }
    }

    /// Whether this type takes money out of the account
    pub fn is_debit(&self) -> bool {
        !matches!(self, TransactionType::Deposit)
    }

    /// Apply the balance effect of this transaction type.
    ///
    /// Transfers and payments only debit the source account; no
    /// counterparty is credited.
    pub fn apply(&self, balance: Decimal, amount: &Amount) -> Result<Decimal, DomainError> {
        let amount = amount.value();

        let next = if self.is_debit() {
            if balance < amount {
                return Err(DomainError::insufficient_funds(amount, balance));
            }
            balance - amount
        } else {
            balance
                .checked_add(amount)
                .filter(|sum| fits_money_range(*sum))
                .ok_or_else(|| {
                    DomainError::InvalidAmount("resulting balance exceeds the maximum".to_string())
                })?
        };

        Ok(to_money(next))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    /// Case-sensitive exact match on the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::InvalidTransactionType(s.to_string()))
    }
}

/// A ledger entry ready to be inserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransactionRecord {
    pub transaction_id: String,
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
}

/// A persisted, immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub transaction_id: String,
    pub account_id: i64,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Attach storage-assigned fields to a new record
    pub fn from_new(id: i64, created_at: DateTime<Utc>, record: NewTransactionRecord) -> Self {
        Self {
            id,
            transaction_id: record.transaction_id,
            account_id: record.account_id,
            transaction_type: record.transaction_type,
            amount: record.amount,
            description: record.description,
            reference: record.reference,
            balance_before: record.balance_before,
            balance_after: record.balance_after,
            created_at,
        }
    }
}
