use thiserror::Error;

use crate::models::TransactionRecord;
use crate::reconciler::FailureKind;
use crate::storage::StoreError;
use crate::types::{AccountId, MonetaryError, Subject, TransactionId};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("User not found for subject [{subject}]")]
    UserNotFound {
        subject: Subject
    },
    #[error("Account [{account_id}] not found")]
    AccountNotFound {
        account_id: AccountId
    },
    #[error("Invalid transaction amount for id=[{transaction_id}]: {source}")]
    InvalidAmount {
        transaction_id: TransactionId,
        #[source]
        source: MonetaryError
    },
    #[error("Balance change for account [{account_id}] overflowed")]
    DeltaOverflow {
        account_id: AccountId
    },
    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError)
}

impl ReconcileError {
    pub fn invalid_amount(record: &TransactionRecord, source: MonetaryError) -> Self {
        Self::InvalidAmount {
            transaction_id: record.transaction_id.clone(),
            source
        }
    }

    pub fn account_not_found(account_id: &AccountId) -> Self {
        Self::AccountNotFound {
            account_id: account_id.clone()
        }
    }

    /// Groups the error into the kind reported on a failed [`Outcome`](crate::reconciler::Outcome).
    ///
    /// `DeltaOverflow` is reported as `InvalidAmount`: it is raised before anything reaches the
    /// store, when the stored amounts of one account cannot be summed exactly. An overflow while
    /// applying the sum to a balance is a `StoreError::Overflow` and stays a `StoreFailure`.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Unauthorized => FailureKind::Unauthorized,
            Self::UserNotFound { .. } | Self::AccountNotFound { .. } => FailureKind::NotFound,
            Self::StoreFailure(StoreError::AccountNotFound { .. }) => FailureKind::NotFound,
            Self::InvalidAmount { .. } | Self::DeltaOverflow { .. } => FailureKind::InvalidAmount,
            Self::StoreFailure(_) => FailureKind::StoreFailure
        }
    }
}
