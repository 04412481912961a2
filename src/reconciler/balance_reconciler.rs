use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{account_path, CacheNotifier, DASHBOARD_PATH};
use crate::identity::{Caller, IdentityProvider};
use crate::models::{Account, TransactionRecord, User};
use crate::reconciler::{BalanceChanges, Outcome, ReconcileError};
use crate::storage::{Store, StoreError, UnitOfWork};
use crate::types::{AccountId, Money, TransactionId};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Sums the reversal of every record per account.
///
/// # Errors
/// Returns `InvalidAmount` for the first record whose stored amount does not parse, and
/// `DeltaOverflow` if an account's sum leaves the representable range.
pub fn balance_changes(records: &[TransactionRecord]) -> Result<BalanceChanges, ReconcileError> {
    let mut changes = BalanceChanges::new();

    for record in records {
        let delta = record.reversal()
            .map_err(|error| ReconcileError::invalid_amount(record, error))?;

        let total = changes.entry(record.account_id.clone()).or_insert_with(Money::zero);
        *total = total.checked_add(delta)
            .ok_or_else(|| ReconcileError::DeltaOverflow { account_id: record.account_id.clone() })?;
    }

    Ok(changes)
}

/// Keeps account balances equal to the sum of their transactions while transactions are
/// removed, and keeps a single default account per user.
///
/// Every collaborator is injected. The reconciler holds no state between calls, so one
/// instance can serve any number of concurrent requests; isolation comes from the store.
pub struct Reconciler<S, I, N> {
    store: Arc<S>,
    identity: Arc<I>,
    notifier: Arc<N>,
    max_attempts: usize
}

impl<S, I, N> Clone for Reconciler<S, I, N> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            identity: self.identity.clone(),
            notifier: self.notifier.clone(),
            max_attempts: self.max_attempts
        }
    }
}

impl<S: Store, I: IdentityProvider, N: CacheNotifier> Reconciler<S, I, N> {
    pub fn new(store: Arc<S>, identity: Arc<I>, notifier: Arc<N>) -> Self {
        Self {
            store,
            identity,
            notifier,
            max_attempts: DEFAULT_MAX_ATTEMPTS
        }
    }

    /// How many times a deletion is attempted when a concurrent deletion got there first.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Deletes the caller's transactions among `transaction_ids` and reverses their effect on
    /// the owning accounts, atomically.
    ///
    /// Ids that do not exist or belong to another user are skipped without error. On success
    /// the payload holds the net change applied to each affected account.
    pub fn bulk_delete_transactions<T>(&self, caller: &Caller, transaction_ids: impl IntoIterator<Item = T>) -> Outcome<BalanceChanges>
    where
        T: Into<TransactionId>
    {
        let requested: BTreeSet<TransactionId> = transaction_ids.into_iter().map(Into::into).collect();
        let result = self.try_bulk_delete(caller, &requested);

        match &result {
            Ok(changes) => info!("Bulk delete removed transactions from {} accounts", changes.len()),
            Err(error) => warn!("Bulk delete error: {error}")
        }

        result.into()
    }

    /// Makes `account_id` the caller's only default account.
    pub fn update_default_account(&self, caller: &Caller, account_id: &AccountId) -> Outcome<Account> {
        let result = self.try_update_default(caller, account_id);

        match &result {
            Ok(account) => info!("Account [{}] is now the default for user [{}]", account.account_id, account.owner),
            Err(error) => warn!("Update default account error: {error}")
        }

        result.into()
    }

    fn resolve_user(&self, caller: &Caller) -> Result<User, ReconcileError> {
        let subject = self.identity.resolve(caller).ok_or(ReconcileError::Unauthorized)?;

        self.store.find_user_by_subject(&subject)?
            .ok_or(ReconcileError::UserNotFound { subject })
    }

    fn try_bulk_delete(&self, caller: &Caller, requested: &BTreeSet<TransactionId>) -> Result<BalanceChanges, ReconcileError> {
        let user = self.resolve_user(caller)?;

        if requested.is_empty() {
            return Ok(BalanceChanges::new());
        }

        let changes = self.delete_and_reconcile(&user, requested)?;

        //NOTE: Only after the commit. A failed invalidation must never undo the balance change.
        for account_id in changes.keys() {
            self.revalidate(&account_path(account_id));
        }
        if !changes.is_empty() {
            self.revalidate(DASHBOARD_PATH);
        }

        Ok(changes)
    }

    fn delete_and_reconcile(&self, user: &User, requested: &BTreeSet<TransactionId>) -> Result<BalanceChanges, ReconcileError> {
        let mut attempt = 1;

        loop {
            let affected = self.store.find_transactions(&user.user_id, requested)?;

            if affected.is_empty() {
                debug!("No transactions owned by user [{}] among {} requested", user.user_id, requested.len());
                return Ok(BalanceChanges::new());
            }

            let changes = balance_changes(&affected)?;
            let affected_ids = affected.into_iter().map(|record| record.transaction_id).collect();

            let work = changes.iter().fold(
                UnitOfWork::new().delete_transactions(&user.user_id, affected_ids),
                |work, (account_id, delta)| work.increment_balance(&user.user_id, account_id, *delta)
            );

            match self.store.commit(&work) {
                Ok(()) => return Ok(changes),
                Err(StoreError::Conflict { .. }) if attempt < self.max_attempts => {
                    debug!("Transactions changed concurrently for user [{}], retrying ({attempt}/{})", user.user_id, self.max_attempts);
                    attempt += 1;
                }
                Err(error) => return Err(error.into())
            }
        }
    }

    fn try_update_default(&self, caller: &Caller, account_id: &AccountId) -> Result<Account, ReconcileError> {
        let user = self.resolve_user(caller)?;
        let owned = self.store.owned_accounts(&user.user_id)?;

        if !owned.iter().any(|account| &account.account_id == account_id) {
            return Err(ReconcileError::account_not_found(account_id));
        }

        let work = UnitOfWork::new()
            .clear_defaults(&user.user_id)
            .set_default(&user.user_id, account_id);
        self.store.commit(&work)?;

        self.revalidate(DASHBOARD_PATH);
        for previous in owned.iter().filter(|account| account.is_default && &account.account_id != account_id) {
            self.revalidate(&account_path(&previous.account_id));
        }
        self.revalidate(&account_path(account_id));

        self.store.find_account(&user.user_id, account_id)?
            .ok_or_else(|| ReconcileError::account_not_found(account_id))
    }

    fn revalidate(&self, path: &str) {
        if let Err(error) = self.notifier.revalidate(path) {
            warn!("{error}");
        }
    }
}
