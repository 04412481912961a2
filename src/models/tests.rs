use super::{Account, TransactionRecord, TransactionType};

use std::str::FromStr;

use anyhow::Result;

use crate::types::{MonetaryError, Money};

fn create_transaction(transaction_type: TransactionType, amount: &str) -> TransactionRecord {
    TransactionRecord::new("t1", "u1", "a1", transaction_type, amount)
}

#[test]
fn test_removing_an_expense_refunds_the_account() -> Result<()> {
    let expense = create_transaction(TransactionType::Expense, "30.00");

    assert_eq!(expense.reversal()?, Money::from_str("30")?);

    Ok(())
}

#[test]
fn test_removing_income_takes_the_funds_back() -> Result<()> {
    let income = create_transaction(TransactionType::Income, "20.5");

    assert_eq!(income.reversal()?, Money::from_str("-20.5")?);

    Ok(())
}

#[test]
fn test_reversal_of_corrupted_amount_fails() {
    let corrupted = create_transaction(TransactionType::Expense, "thirty");
    let negative = create_transaction(TransactionType::Income, "-5");

    assert!(matches!(corrupted.reversal(), Err(MonetaryError::InvalidFormat(_))));
    assert!(matches!(negative.reversal(), Err(MonetaryError::Negative(_))));
}

#[test]
fn test_transaction_type_round_trips_through_its_stored_name() -> Result<()> {
    for transaction_type in [TransactionType::Income, TransactionType::Expense] {
        assert_eq!(TransactionType::from_str(transaction_type.as_str()).ok(), Some(transaction_type));
    }

    assert!(TransactionType::from_str("income").is_err());

    Ok(())
}

#[test]
fn test_new_account_is_not_default() -> Result<()> {
    let account = Account::new("a1", "u1", Money::from_str("100")?);

    assert!(!account.is_default);
    assert!(account.with_default(true).is_default);

    Ok(())
}
