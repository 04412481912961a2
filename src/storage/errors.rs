use rusqlite::ErrorCode;
use thiserror::Error;

use crate::types::{AccountId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account [{account_id}] was not found for user [{owner}]")]
    AccountNotFound {
        owner: UserId,
        account_id: AccountId
    },
    #[error("Expected to delete {expected} transactions for user [{owner}] but {deleted} were present")]
    Conflict {
        owner: UserId,
        expected: usize,
        deleted: usize
    },
    #[error("Balance of account [{account_id}] would overflow")]
    Overflow {
        account_id: AccountId
    },
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error)
}

impl StoreError {
    pub fn account_not_found(owner: &UserId, account_id: &AccountId) -> Self {
        Self::AccountNotFound {
            owner: owner.clone(),
            account_id: account_id.clone()
        }
    }

    pub fn lock_poisoned() -> Self {
        Self::Unavailable("store lock was poisoned by a panicked writer".to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            // 1555 is a PRIMARY KEY violation, 2067 a UNIQUE violation.
            rusqlite::Error::SqliteFailure(ref failure, ref description)
                if failure.extended_code == 1555 || failure.extended_code == 2067 =>
            {
                StoreError::Duplicate(description.clone().unwrap_or_else(|| failure.to_string()))
            }
            // 787 is a FOREIGN KEY violation.
            rusqlite::Error::SqliteFailure(ref failure, _) if failure.extended_code == 787 => {
                StoreError::Corrupt("foreign key constraint failed".to_string())
            }
            rusqlite::Error::SqliteFailure(ref failure, _)
                if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen) =>
            {
                StoreError::Unavailable(failure.to_string())
            }
            other => StoreError::Sqlite(other)
        }
    }
}
