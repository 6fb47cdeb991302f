//! Account
//!
//! Account state as read and written by the transaction processor.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Closed => "closed",
        }
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "frozen" => Ok(AccountStatus::Frozen),
            "closed" => Ok(AccountStatus::Closed),
            other => Err(format!("unknown account status '{}'", other)),
        }
    }
}

/// A bank account.
///
/// `balance` is only ever changed inside a ledger unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub account_number: String,
    pub customer_id: i64,
    pub account_type: String,
    pub balance: Decimal,
    pub currency: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a freshly opened account (used by the in-memory store and tests)
    pub fn open(id: i64, customer_id: i64, account_type: &str, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            account_number: super::identifiers::account_number(),
            customer_id,
            account_type: account_type.to_string(),
            balance: super::amount::to_money(balance),
            currency: "USD".to_string(),
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
