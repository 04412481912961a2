//! A SQLite backed store.
//!
//! Monetary columns are TEXT holding exact decimal strings, never REAL.
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use tracing::debug;

use crate::models::{Account, TransactionRecord, TransactionType, User};
use crate::storage::{LedgerSnapshot, Operation, Store, StoreError, UnitOfWork};
use crate::types::{AccountId, Money, Subject, TransactionId, UserId};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS app_user (
        id TEXT PRIMARY KEY,
        subject TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS account (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES app_user(id),
        balance TEXT NOT NULL,
        is_default INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS ledger_transaction (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES app_user(id),
        account_id TEXT NOT NULL REFERENCES account(id),
        type TEXT NOT NULL,
        amount TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS ledger_transaction_user_idx ON ledger_transaction(user_id);
";

/// Raw `account` row before its balance is parsed.
type AccountRow = (String, String, String, bool);

/// Raw `ledger_transaction` row before its type is parsed.
type TransactionRow = (String, String, String, String, String);

/// Accounts, users, and ledger entries in a SQLite database.
///
/// Each unit of work runs inside an `IMMEDIATE` transaction, which takes the database write
/// lock up front, so concurrent commits serialize at the database.
pub struct SqliteStore {
    connection: Mutex<Connection>
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(SCHEMA)?;

        Ok(Self {
            connection: Mutex::new(connection)
        })
    }

    /// Runs `sql` directly. Used to simulate data written by other tools.
    pub fn execute_raw(&self, sql: &str) -> Result<(), StoreError> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::lock_poisoned())
    }
}

/// Ids bound per statement. SQLite caps the number of bound parameters per statement, and an
/// id set of any size is split into statements of at most this many ids.
const IDS_PER_STATEMENT: usize = 500;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn map_account((account_id, owner, balance, is_default): AccountRow) -> Result<Account, StoreError> {
    let balance = Money::from_str(&balance)
        .map_err(|error| StoreError::Corrupt(format!("balance of account [{account_id}]: {error}")))?;

    Ok(Account::new(AccountId::new(account_id), UserId::new(owner), balance).with_default(is_default))
}

fn map_transaction((transaction_id, owner, account_id, transaction_type, amount): TransactionRow) -> Result<TransactionRecord, StoreError> {
    let transaction_type = TransactionType::from_str(&transaction_type)
        .map_err(|error| StoreError::Corrupt(format!("transaction [{transaction_id}]: {error}")))?;

    Ok(TransactionRecord::new(
        TransactionId::new(transaction_id),
        UserId::new(owner),
        AccountId::new(account_id),
        transaction_type,
        amount
    ))
}

fn apply(transaction: &rusqlite::Transaction<'_>, operation: &Operation) -> Result<(), StoreError> {
    match operation {
        Operation::DeleteTransactions { owner, ids, expected } => {
            let mut deleted = 0;

            for chunk in ids.iter().collect::<Vec<_>>().chunks(IDS_PER_STATEMENT) {
                let sql = format!(
                    "DELETE FROM ledger_transaction WHERE user_id = ? AND id IN ({})",
                    placeholders(chunk.len())
                );
                let values = std::iter::once(owner.as_str()).chain(chunk.iter().map(|id| id.as_str()));

                deleted += transaction.execute(&sql, params_from_iter(values))?;
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
            let balance: String = transaction
                .query_row(
                    "SELECT balance FROM account WHERE id = ?1 AND user_id = ?2",
                    params![account_id.as_str(), owner.as_str()],
                    |row| row.get(0)
                )
                .optional()?
                .ok_or_else(|| StoreError::account_not_found(owner, account_id))?;

            let balance = Money::from_str(&balance)
                .map_err(|error| StoreError::Corrupt(format!("balance of account [{account_id}]: {error}")))?
                .checked_add(*delta)
                .ok_or_else(|| StoreError::Overflow { account_id: account_id.clone() })?;

            transaction.execute(
                "UPDATE account SET balance = ?1 WHERE id = ?2",
                params![balance.to_string(), account_id.as_str()]
            )?;
        }
        Operation::ClearDefaults { owner } => {
            transaction.execute(
                "UPDATE account SET is_default = 0 WHERE user_id = ?1 AND is_default = 1",
                params![owner.as_str()]
            )?;
        }
        Operation::SetDefault { owner, account_id } => {
            let updated = transaction.execute(
                "UPDATE account SET is_default = 1 WHERE id = ?1 AND user_id = ?2",
                params![account_id.as_str(), owner.as_str()]
            )?;

            if updated == 0 {
                return Err(StoreError::account_not_found(owner, account_id));
            }
        }
    }

    Ok(())
}

impl Store for SqliteStore {
    fn find_user_by_subject(&self, subject: &Subject) -> Result<Option<User>, StoreError> {
        let connection = self.connection()?;

        let user = connection
            .query_row(
                "SELECT id, subject FROM app_user WHERE subject = ?1",
                params![subject.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            )
            .optional()?;

        Ok(user.map(|(user_id, subject)| User::new(UserId::new(user_id), Subject::new(subject))))
    }

    fn find_transactions(&self, owner: &UserId, ids: &BTreeSet<TransactionId>) -> Result<Vec<TransactionRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let connection = self.connection()?;
        let mut rows = Vec::with_capacity(ids.len().min(IDS_PER_STATEMENT));

        for chunk in ids.iter().collect::<Vec<_>>().chunks(IDS_PER_STATEMENT) {
            let sql = format!(
                "SELECT id, user_id, account_id, type, amount FROM ledger_transaction
                    WHERE user_id = ? AND id IN ({}) ORDER BY id",
                placeholders(chunk.len())
            );
            let values = std::iter::once(owner.as_str()).chain(chunk.iter().map(|id| id.as_str()));

            let mut statement = connection.prepare(&sql)?;
            let chunk_rows = statement
                .query_map(params_from_iter(values), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<Result<Vec<TransactionRow>, rusqlite::Error>>()?;

            rows.extend(chunk_rows);
        }

        //NOTE: chunks follow the BTreeSet order, so rows stay sorted by id across chunks
        rows.into_iter().map(map_transaction).collect()
    }

    fn find_account(&self, owner: &UserId, account_id: &AccountId) -> Result<Option<Account>, StoreError> {
        let connection = self.connection()?;

        let row: Option<AccountRow> = connection
            .query_row(
                "SELECT id, user_id, balance, is_default FROM account WHERE id = ?1 AND user_id = ?2",
                params![account_id.as_str(), owner.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            )
            .optional()?;

        row.map(map_account).transpose()
    }

    fn owned_accounts(&self, owner: &UserId) -> Result<Vec<Account>, StoreError> {
        let connection = self.connection()?;

        let rows = connection
            .prepare("SELECT id, user_id, balance, is_default FROM account WHERE user_id = ?1 ORDER BY id")?
            .query_map(params![owner.as_str()], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<AccountRow>, rusqlite::Error>>()?;

        rows.into_iter().map(map_account).collect()
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let connection = self.connection()?;

        let rows = connection
            .prepare("SELECT id, user_id, balance, is_default FROM account ORDER BY id")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<AccountRow>, rusqlite::Error>>()?;

        rows.into_iter().map(map_account).collect()
    }

    fn import(&self, snapshot: LedgerSnapshot) -> Result<(), StoreError> {
        let mut connection = self.connection()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for user in &snapshot.users {
            transaction.execute(
                "INSERT INTO app_user (id, subject) VALUES (?1, ?2)",
                params![user.user_id.as_str(), user.subject.as_str()]
            )?;
        }

        for account in &snapshot.accounts {
            transaction.execute(
                "INSERT INTO account (id, user_id, balance, is_default) VALUES (?1, ?2, ?3, ?4)",
                params![account.account_id.as_str(), account.owner.as_str(), account.balance.to_string(), account.is_default]
            )?;
        }

        for record in &snapshot.transactions {
            transaction.execute(
                "INSERT INTO ledger_transaction (id, user_id, account_id, type, amount) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.transaction_id.as_str(),
                    record.owner.as_str(),
                    record.account_id.as_str(),
                    record.transaction_type.as_str(),
                    record.amount
                ]
            )?;
        }

        transaction.commit()?;

        Ok(())
    }

    fn commit(&self, work: &UnitOfWork) -> Result<(), StoreError> {
        let mut connection = self.connection()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        //NOTE: An early return drops `transaction`, which rolls it back.
        for operation in work.operations() {
            apply(&transaction, operation)?;
        }

        transaction.commit()?;
        debug!("Committed unit of work with {} operations", work.len());

        Ok(())
    }
}
