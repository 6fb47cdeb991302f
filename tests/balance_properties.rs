//! Property tests for balance arithmetic through the processor

use core_banking::domain::{Account, DomainError, TransactionType};
use core_banking::handlers::{ProcessTransactionCommand, TransactionProcessor};
use core_banking::ledger::MemoryLedgerStore;
use core_banking::{AppError, OperationContext};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn transaction_type() -> impl Strategy<Value = TransactionType> {
    prop::sample::select(TransactionType::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn balance_follows_accepted_records(
        opening_cents in 0i64..1_000_000,
        ops in prop::collection::vec((transaction_type(), 1i64..200_000), 1..40),
    ) {
        let opening = Decimal::new(opening_cents, 2);
        let store = MemoryLedgerStore::new();
        store.insert_account(Account::open(1, 1, "checking", opening));
        let processor = TransactionProcessor::new(store);
        let context = OperationContext::new();

        let mut expected = opening;

        for (kind, cents) in ops {
            let amount = Decimal::new(cents, 2);
            let command = ProcessTransactionCommand::new(1, kind.as_str(), amount);
            let result = tokio_test::block_on(processor.process(command, &context));

            match result {
                Ok(record) => {
                    prop_assert_eq!(record.balance_before, expected);
                    if kind.is_debit() {
                        prop_assert!(expected >= amount);
                        expected -= amount;
                    } else {
                        expected += amount;
                    }
                    prop_assert_eq!(record.balance_after, expected);
                }
                Err(AppError::Domain(DomainError::InsufficientFunds { required, available })) => {
                    prop_assert!(kind.is_debit());
                    prop_assert_eq!(required, amount);
                    prop_assert_eq!(available, expected);
                    prop_assert!(available < required);
                }
                Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
            }

            prop_assert!(expected >= Decimal::ZERO);
        }

        let account = tokio_test::block_on(processor.store().account(1)).unwrap();
        prop_assert_eq!(account.balance, expected);

        let records = processor.store().records_for(1);
        let net: Decimal = records
            .iter()
            .map(|r| if r.transaction_type.is_debit() { -r.amount } else { r.amount })
            .sum();
        prop_assert_eq!(opening + net, account.balance);
    }
}
