use crate::types::{AccountId, Money, UserId};

/// A financial account owned by exactly one user.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Account {
    pub account_id: AccountId,
    pub owner: UserId,
    /// Running balance. Kept equal to the signed sum of the account's transactions
    /// (plus manual adjustments made outside this crate).
    pub balance: Money,
    /// At most one account per owner carries this flag.
    pub is_default: bool
}

impl Account {
    pub fn new(account_id: impl Into<AccountId>, owner: impl Into<UserId>, balance: Money) -> Self {
        Self {
            account_id: account_id.into(),
            owner: owner.into(),
            balance,
            is_default: false
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}
