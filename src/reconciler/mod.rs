mod balance_reconciler;
mod errors;
mod outcome;

use std::collections::BTreeMap;

use crate::types::{AccountId, Money};

pub use balance_reconciler::{balance_changes, Reconciler, DEFAULT_MAX_ATTEMPTS};
pub use errors::ReconcileError;
pub use outcome::{FailureKind, Outcome};

/// Net signed adjustment per account.
pub type BalanceChanges = BTreeMap<AccountId, Money>;
