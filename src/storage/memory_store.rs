use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::models::{Account, TransactionRecord, User};
use crate::storage::{LedgerSnapshot, Operation, Store, StoreError, UnitOfWork};
use crate::types::{AccountId, Subject, TransactionId, UserId};

/// Prior state of a row touched by an in-flight unit of work.
enum Undo {
    Transaction(TransactionRecord),
    Account(Account)
}

/// In-process store.
///
/// Tables live in concurrent maps. A commit takes the exclusive side of `commit_lock`, applies
/// its operations while journaling the prior state of every row it touches, and replays the
/// journal backwards if any operation fails. Reads take the shared side, so they never observe
/// a half-applied unit of work.
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    subjects: DashMap<Subject, UserId>,
    accounts: DashMap<AccountId, Account>,
    transactions: DashMap<TransactionId, TransactionRecord>,
    commit_lock: RwLock<()>,
    fault: Mutex<Option<usize>>
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            subjects: DashMap::new(),
            accounts: DashMap::new(),
            transactions: DashMap::new(),
            commit_lock: RwLock::new(()),
            fault: Mutex::new(None)
        }
    }

    /// Makes the next commit lose its connection after `operations` operations were applied.
    ///
    /// The commit then fails with [`StoreError::Unavailable`] and is rolled back like any other
    /// failed unit of work.
    pub fn fail_commit_after(&self, operations: usize) {
        match self.fault.lock() {
            Ok(mut fault) => *fault = Some(operations),
            Err(_) => warn!("Could not arm commit fault, lock poisoned")
        }
    }

    /// Number of stored transactions across all users.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, ()>, StoreError> {
        self.commit_lock.read().map_err(|_| StoreError::lock_poisoned())
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, ()>, StoreError> {
        self.commit_lock.write().map_err(|_| StoreError::lock_poisoned())
    }

    fn take_fault(&self) -> Result<Option<usize>, StoreError> {
        self.fault.lock().map(|mut fault| fault.take()).map_err(|_| StoreError::lock_poisoned())
    }

    fn apply(&self, operation: &Operation, journal: &mut Vec<Undo>) -> Result<(), StoreError> {
        match operation {
            Operation::DeleteTransactions { owner, ids, expected } => {
                let mut deleted = 0;

                for id in ids {
                    if let Some((_, record)) = self.transactions.remove_if(id, |_, record| &record.owner == owner) {
                        journal.push(Undo::Transaction(record));
                        deleted += 1;
                    }
                }

                if deleted != *expected {
                    return Err(StoreError::Conflict {
                        owner: owner.clone(),
                        expected: *expected,
                        deleted
                    });
                }
            }
            Operation::IncrementBalance { owner, account_id, delta } => {
                let mut account = self.accounts.get_mut(account_id)
                    .filter(|account| &account.owner == owner)
                    .ok_or_else(|| StoreError::account_not_found(owner, account_id))?;

                let balance = account.balance.checked_add(*delta)
                    .ok_or_else(|| StoreError::Overflow { account_id: account_id.clone() })?;

                journal.push(Undo::Account(account.clone()));
                account.balance = balance;
            }
            Operation::ClearDefaults { owner } => {
                for mut account in self.accounts.iter_mut() {
                    if &account.owner == owner && account.is_default {
                        journal.push(Undo::Account(account.clone()));
                        account.is_default = false;
                    }
                }
            }
            Operation::SetDefault { owner, account_id } => {
                let mut account = self.accounts.get_mut(account_id)
                    .filter(|account| &account.owner == owner)
                    .ok_or_else(|| StoreError::account_not_found(owner, account_id))?;

                journal.push(Undo::Account(account.clone()));
                account.is_default = true;
            }
        }

        Ok(())
    }

    fn rollback(&self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Transaction(record) => {
                    self.transactions.insert(record.transaction_id.clone(), record);
                }
                Undo::Account(account) => {
                    self.accounts.insert(account.account_id.clone(), account);
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn find_user_by_subject(&self, subject: &Subject) -> Result<Option<User>, StoreError> {
        let _guard = self.read_guard()?;

        let Some(user_id) = self.subjects.get(subject).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };

        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    fn find_transactions(&self, owner: &UserId, ids: &BTreeSet<TransactionId>) -> Result<Vec<TransactionRecord>, StoreError> {
        let _guard = self.read_guard()?;

        Ok(ids.iter()
            .filter_map(|id| self.transactions.get(id))
            .filter(|record| &record.owner == owner)
            .map(|record| record.value().clone())
            .collect())
    }

    fn find_account(&self, owner: &UserId, account_id: &AccountId) -> Result<Option<Account>, StoreError> {
        let _guard = self.read_guard()?;

        Ok(self.accounts.get(account_id)
            .filter(|account| &account.owner == owner)
            .map(|account| account.value().clone()))
    }

    fn owned_accounts(&self, owner: &UserId) -> Result<Vec<Account>, StoreError> {
        let _guard = self.read_guard()?;

        let mut accounts: Vec<Account> = self.accounts.iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|left, right| left.account_id.cmp(&right.account_id));

        Ok(accounts)
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let _guard = self.read_guard()?;

        let mut accounts: Vec<Account> = self.accounts.iter().map(|entry| entry.value().clone()).collect();
        accounts.sort_by(|left, right| left.account_id.cmp(&right.account_id));

        Ok(accounts)
    }

    fn import(&self, snapshot: LedgerSnapshot) -> Result<(), StoreError> {
        let _guard = self.write_guard()?;

        let mut user_ids = HashSet::new();
        let mut subjects = HashSet::new();
        for user in &snapshot.users {
            if self.users.contains_key(&user.user_id) || !user_ids.insert(&user.user_id) {
                return Err(StoreError::Duplicate(format!("user [{}]", user.user_id)));
            }
            if self.subjects.contains_key(&user.subject) || !subjects.insert(&user.subject) {
                return Err(StoreError::Duplicate(format!("subject [{}]", user.subject)));
            }
        }

        let mut account_ids = HashSet::new();
        for account in &snapshot.accounts {
            if self.accounts.contains_key(&account.account_id) || !account_ids.insert(&account.account_id) {
                return Err(StoreError::Duplicate(format!("account [{}]", account.account_id)));
            }
        }

        let mut transaction_ids = HashSet::new();
        for record in &snapshot.transactions {
            if self.transactions.contains_key(&record.transaction_id) || !transaction_ids.insert(&record.transaction_id) {
                return Err(StoreError::Duplicate(format!("transaction [{}]", record.transaction_id)));
            }
        }

        for user in snapshot.users {
            self.subjects.insert(user.subject.clone(), user.user_id.clone());
            self.users.insert(user.user_id.clone(), user);
        }

        for account in snapshot.accounts {
            self.accounts.insert(account.account_id.clone(), account);
        }

        for record in snapshot.transactions {
            self.transactions.insert(record.transaction_id.clone(), record);
        }

        Ok(())
    }

    fn commit(&self, work: &UnitOfWork) -> Result<(), StoreError> {
        let _guard = self.write_guard()?;
        let fault = self.take_fault()?;
        let mut journal = Vec::new();

        for (applied, operation) in work.operations().iter().enumerate() {
            if fault == Some(applied) {
                self.rollback(journal);
                return Err(StoreError::Unavailable(format!("connection lost after {applied} operations")));
            }

            if let Err(error) = self.apply(operation, &mut journal) {
                debug!("Rolling back unit of work: {error}");
                self.rollback(journal);
                return Err(error);
            }
        }

        if fault.is_some_and(|operations| operations >= work.len()) {
            self.rollback(journal);
            return Err(StoreError::Unavailable("connection lost before commit".to_string()));
        }

        debug!("Committed unit of work with {} operations", work.len());

        Ok(())
    }
}
