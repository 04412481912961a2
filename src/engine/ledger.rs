//! Reads a ledger snapshot from CSV.
//!
//! Header: `record,id,owner,account,type,amount,default`. A `user` row carries the identity
//! subject in `owner`; `account` and `transaction` rows carry the owning user id.
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Account, TransactionRecord, TransactionType, User};
use crate::storage::LedgerSnapshot;
use crate::types::{AccountId, Money, Subject, TransactionId, UserId};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Could not open ledger at [{path}]: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error
    },
    #[error("Malformed ledger: {0}")]
    Csv(#[from] csv::Error),
    #[error("Ledger line {line}: {reason}")]
    Invalid {
        line: usize,
        reason: String
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordKind {
    User,
    Account,
    Transaction
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    record: RecordKind,
    id: String,
    owner: String,
    account: Option<String>,
    #[serde(rename = "type")]
    transaction_type: Option<TransactionType>,
    amount: Option<String>,
    default: Option<bool>
}

fn invalid(line: usize, reason: impl Into<String>) -> LedgerError {
    LedgerError::Invalid { line, reason: reason.into() }
}

fn required(line: usize, field: &str, value: Option<String>) -> Result<String, LedgerError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| invalid(line, format!("missing {field}")))
}

pub fn load_ledger(path: &Path) -> Result<LedgerSnapshot, LedgerError> {
    let file = File::open(path).map_err(|source| LedgerError::Io {
        path: path.display().to_string(),
        source
    })?;

    read_ledger(BufReader::new(file))
}

/// Parses and cross-checks a ledger.
///
/// Transaction amounts are kept exactly as written. Account balances must parse.
pub fn read_ledger<R: Read>(reader: R) -> Result<LedgerSnapshot, LedgerError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(reader);

    let mut snapshot = LedgerSnapshot::default();
    let mut lines = HashMap::new();

    for (index, row) in reader.deserialize::<LedgerRow>().enumerate() {
        let line = index + 2;
        let row = row?;

        if row.id.is_empty() || row.owner.is_empty() {
            return Err(invalid(line, "id and owner are required"));
        }

        match row.record {
            RecordKind::User => {
                snapshot.users.push(User::new(UserId::new(row.id), Subject::new(row.owner)));
            }
            RecordKind::Account => {
                let balance = required(line, "balance", row.amount)?;
                let balance = balance.parse::<Money>()
                    .map_err(|error| invalid(line, error.to_string()))?;
                let account = Account::new(AccountId::new(row.id), UserId::new(row.owner), balance)
                    .with_default(row.default.unwrap_or(false));

                lines.insert(account.account_id.to_string(), line);
                snapshot.accounts.push(account);
            }
            RecordKind::Transaction => {
                let account_id = required(line, "account", row.account)?;
                let transaction_type = row.transaction_type.ok_or_else(|| invalid(line, "missing type"))?;
                let amount = required(line, "amount", row.amount)?;
                let record = TransactionRecord::new(
                    TransactionId::new(row.id),
                    UserId::new(row.owner),
                    AccountId::new(account_id),
                    transaction_type,
                    amount
                );

                lines.insert(record.transaction_id.to_string(), line);
                snapshot.transactions.push(record);
            }
        }
    }

    check_references(&snapshot, &lines)?;

    Ok(snapshot)
}

fn check_references(snapshot: &LedgerSnapshot, lines: &HashMap<String, usize>) -> Result<(), LedgerError> {
    let line_of = |id: &str| lines.get(id).copied().unwrap_or(0);
    let users: HashSet<&UserId> = snapshot.users.iter().map(|user| &user.user_id).collect();
    let owners: HashMap<&AccountId, &UserId> = snapshot.accounts.iter()
        .map(|account| (&account.account_id, &account.owner))
        .collect();

    let mut defaults = HashSet::new();
    for account in &snapshot.accounts {
        if !users.contains(&account.owner) {
            return Err(invalid(line_of(account.account_id.as_str()), format!("unknown user [{}]", account.owner)));
        }
        if account.is_default && !defaults.insert(&account.owner) {
            return Err(invalid(line_of(account.account_id.as_str()), format!("user [{}] already has a default account", account.owner)));
        }
    }

    for record in &snapshot.transactions {
        match owners.get(&record.account_id) {
            Some(owner) if *owner == &record.owner => {}
            _ => {
                return Err(invalid(
                    line_of(record.transaction_id.as_str()),
                    format!("account [{}] is not owned by user [{}]", record.account_id, record.owner)
                ));
            }
        }
    }

    Ok(())
}
