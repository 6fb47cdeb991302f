//! Command definitions
//!
//! Commands represent intentions to change the system state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Command to apply a transaction to one account
///
/// `transaction_type` stays a raw string here; it is validated by the
/// processor so unknown values surface as `InvalidTransactionType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessTransactionCommand {
    pub account_id: i64,
    pub transaction_type: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl ProcessTransactionCommand {
    pub fn new(account_id: i64, transaction_type: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_id,
            transaction_type: transaction_type.into(),
            amount,
            description: None,
            reference: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_command_builder() {
        let cmd = ProcessTransactionCommand::new(1, "deposit", dec!(50.00))
            .with_description("Salary")
            .with_reference("INV-7");

        assert_eq!(cmd.account_id, 1);
        assert_eq!(cmd.transaction_type, "deposit");
        assert_eq!(cmd.description.as_deref(), Some("Salary"));
        assert_eq!(cmd.reference.as_deref(), Some("INV-7"));
    }
}
