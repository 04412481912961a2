use std::collections::BTreeSet;

use crate::types::{AccountId, Money, TransactionId, UserId};

/// A single step of a [`UnitOfWork`]. Every step is scoped to an owner.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Operation {
    /// Delete the owner's transactions among `ids`. Exactly `expected` of them must still exist.
    DeleteTransactions {
        owner: UserId,
        ids: BTreeSet<TransactionId>,
        expected: usize
    },
    IncrementBalance {
        owner: UserId,
        account_id: AccountId,
        delta: Money
    },
    ClearDefaults {
        owner: UserId
    },
    SetDefault {
        owner: UserId,
        account_id: AccountId
    }
}

/// An ordered group of operations that a [`Store`](super::Store) applies all-or-nothing.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UnitOfWork {
    operations: Vec<Operation>
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_transactions(mut self, owner: &UserId, ids: BTreeSet<TransactionId>) -> Self {
        let expected = ids.len();

        self.operations.push(Operation::DeleteTransactions {
            owner: owner.clone(),
            ids,
            expected
        });
        self
    }

    pub fn increment_balance(mut self, owner: &UserId, account_id: &AccountId, delta: Money) -> Self {
        self.operations.push(Operation::IncrementBalance {
            owner: owner.clone(),
            account_id: account_id.clone(),
            delta
        });
        self
    }

    pub fn clear_defaults(mut self, owner: &UserId) -> Self {
        self.operations.push(Operation::ClearDefaults { owner: owner.clone() });
        self
    }

    pub fn set_default(mut self, owner: &UserId, account_id: &AccountId) -> Self {
        self.operations.push(Operation::SetDefault {
            owner: owner.clone(),
            account_id: account_id.clone()
        });
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
