use crate::models::TransactionType;
use crate::types::{AccountId, MonetaryError, Money, TransactionId, UserId};

/// A ledger entry as persisted.
///
/// The amount is kept in its stored textual form. It is only turned into [`Money`] when the
/// entry is about to affect a balance, so a corrupted row is detected at that point instead
/// of being coerced on load.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub owner: UserId,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    /// Non-negative magnitude, as stored.
    pub amount: String
}

impl TransactionRecord {
    pub fn new(
        transaction_id: impl Into<TransactionId>,
        owner: impl Into<UserId>,
        account_id: impl Into<AccountId>,
        transaction_type: TransactionType,
        amount: impl Into<String>
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            owner: owner.into(),
            account_id: account_id.into(),
            transaction_type,
            amount: amount.into()
        }
    }

    /// The signed balance adjustment that removing this entry requires.
    ///
    /// Removing an expense refunds the account, removing income takes the credited funds back.
    pub fn reversal(&self) -> Result<Money, MonetaryError> {
        let amount = Money::parse_magnitude(&self.amount)?;

        Ok(match self.transaction_type {
            TransactionType::Expense => amount,
            TransactionType::Income => -amount
        })
    }
}
