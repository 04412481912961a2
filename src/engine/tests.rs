use super::{read_ledger, warm_cache, write_accounts, BatchEngine, BatchSummary, LedgerError};

use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tempfile::NamedTempFile;

use crate::cache::PageCache;
use crate::identity::PassthroughIdentity;
use crate::reconciler::Reconciler;
use crate::storage::{MemoryStore, Store};
use crate::types::{AccountId, Money, UserId};

const LEDGER: &str = "record,id,owner,account,type,amount,default
user,u1,alice,,,,
user,u2,bob,,,,
account,x,u1,,,100.00,true
account,y,u1,,,0,false
account,z,u2,,,5,true
transaction,t1,u1,x,EXPENSE,30,
transaction,t2,u1,x,INCOME,20,
transaction,t3,u2,z,EXPENSE,5,
";

fn create_temporary_csv(content: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{content}")?;
    Ok(file)
}

fn engine_with_ledger() -> Result<(Arc<MemoryStore>, Arc<PageCache>, BatchEngine<MemoryStore, PassthroughIdentity, PageCache>)> {
    let store = Arc::new(MemoryStore::new());
    store.import(read_ledger(LEDGER.as_bytes())?)?;

    let cache = Arc::new(PageCache::new(64));
    let reconciler = Reconciler::new(store.clone(), Arc::new(PassthroughIdentity), cache.clone());

    Ok((store, cache, BatchEngine::new(reconciler)))
}

fn balance_of(store: &MemoryStore, owner: &str, account_id: &str) -> Result<Money> {
    store.find_account(&UserId::from(owner), &AccountId::from(account_id))?
        .map(|account| account.balance)
        .ok_or_else(|| anyhow!("Account {account_id} missing from store"))
}

#[test]
fn test_ledger_is_read_with_raw_transaction_amounts() -> Result<()> {
    let snapshot = read_ledger(LEDGER.as_bytes())?;

    assert_eq!(snapshot.users.len(), 2);
    assert_eq!(snapshot.accounts.len(), 3);
    assert_eq!(snapshot.transactions.len(), 3);
    assert!(snapshot.accounts[0].is_default);
    assert!(!snapshot.accounts[1].is_default);
    assert_eq!(snapshot.transactions[0].amount, "30");

    Ok(())
}

#[test]
fn test_ledger_rejects_inconsistent_rows() {
    let bad_balance = "record,id,owner,account,type,amount,default\nuser,u1,alice,,,,\naccount,x,u1,,,ten,\n";
    let unknown_owner = "record,id,owner,account,type,amount,default\naccount,x,u9,,,1,\n";
    let foreign_account = "record,id,owner,account,type,amount,default\nuser,u1,alice,,,,\nuser,u2,bob,,,,\naccount,z,u2,,,1,\ntransaction,t1,u1,z,EXPENSE,1,\n";
    let two_defaults = "record,id,owner,account,type,amount,default\nuser,u1,alice,,,,\naccount,x,u1,,,1,true\naccount,y,u1,,,1,true\n";
    let missing_type = "record,id,owner,account,type,amount,default\nuser,u1,alice,,,,\naccount,x,u1,,,1,\ntransaction,t1,u1,x,,1,\n";

    assert!(matches!(read_ledger(bad_balance.as_bytes()), Err(LedgerError::Invalid { line: 3, .. })));
    assert!(matches!(read_ledger(unknown_owner.as_bytes()), Err(LedgerError::Invalid { line: 2, .. })));
    assert!(matches!(read_ledger(foreign_account.as_bytes()), Err(LedgerError::Invalid { line: 5, .. })));
    assert!(matches!(read_ledger(two_defaults.as_bytes()), Err(LedgerError::Invalid { line: 4, .. })));
    assert!(matches!(read_ledger(missing_type.as_bytes()), Err(LedgerError::Invalid { line: 4, .. })));
}

#[tokio::test]
async fn test_engine_executes_operations_in_file_order() -> Result<()> {
    let (store, _cache, engine) = engine_with_ledger()?;
    let operations = create_temporary_csv("operation,session,target
delete,alice,t1 t2
default,alice,y
delete,bob,t3
")?;

    let summary = engine.run(operations.path()).await?;

    assert_eq!(summary, BatchSummary { succeeded: 3, failed: 0 });
    assert_eq!(balance_of(&store, "u1", "x")?, Money::from_str("110")?);
    assert_eq!(balance_of(&store, "u2", "z")?, Money::from_str("10")?);
    assert_eq!(store.transaction_count(), 0);

    let defaults: Vec<String> = store.accounts()?.into_iter()
        .filter(|account| account.is_default)
        .map(|account| account.account_id.to_string())
        .collect();
    assert_eq!(defaults, vec!["y", "z"]);

    Ok(())
}

#[tokio::test]
async fn test_engine_counts_rejected_operations_and_skips_malformed_rows() -> Result<()> {
    let (store, _cache, engine) = engine_with_ledger()?;
    let operations = create_temporary_csv("operation,session,target
delete,,t1
delete,mallory,t1
explode,alice,t1
default,alice,z
delete,alice,t3
")?;

    let summary = engine.run(operations.path()).await?;

    // Anonymous, unknown user and foreign default fail; deleting a foreign transaction is a no-op success.
    assert_eq!(summary, BatchSummary { succeeded: 1, failed: 3 });
    assert_eq!(store.transaction_count(), 3);
    assert_eq!(balance_of(&store, "u1", "x")?, Money::from_str("100")?);

    Ok(())
}

#[tokio::test]
async fn test_engine_handles_missing_csv_file_without_error() -> Result<()> {
    let (store, _cache, engine) = engine_with_ledger()?;

    let summary = engine.run(Path::new("missing.csv")).await?;

    assert_eq!(summary, BatchSummary::default());
    assert_eq!(store.transaction_count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_account_table_reflects_revalidated_pages() -> Result<()> {
    let (store, cache, engine) = engine_with_ledger()?;
    warm_cache(&*store, &cache)?;

    let operations = create_temporary_csv("operation,session,target\ndelete,alice,t1\n")?;
    engine.run(operations.path()).await?;

    let mut output = Vec::new();
    write_accounts(&*store, &cache, &mut output)?;

    assert_eq!(
        String::from_utf8(output)?,
        "account,owner,balance,default\nx,u1,130.00,true\ny,u1,0,false\nz,u2,5,true\n"
    );

    Ok(())
}

#[tokio::test]
async fn test_account_table_shows_moved_default_flag() -> Result<()> {
    let (store, cache, engine) = engine_with_ledger()?;
    warm_cache(&*store, &cache)?;

    let operations = create_temporary_csv("operation,session,target\ndefault,alice,y\n")?;
    engine.run(operations.path()).await?;

    let mut output = Vec::new();
    write_accounts(&*store, &cache, &mut output)?;

    assert_eq!(
        String::from_utf8(output)?,
        "account,owner,balance,default\nx,u1,100.00,false\ny,u1,0,true\nz,u2,5,true\n"
    );

    Ok(())
}
