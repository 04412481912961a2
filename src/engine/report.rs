use std::io::Write;

use crate::cache::{account_path, PageCache};
use crate::models::Account;
use crate::storage::Store;

pub const ACCOUNT_TABLE_HEADER: &str = "account,owner,balance,default";

pub fn render_account_row(account: &Account) -> String {
    format!("{},{},{},{}", account.account_id, account.owner, account.balance, account.is_default)
}

/// Renders every account into the page cache.
pub fn warm_cache<S: Store>(store: &S, cache: &PageCache) -> anyhow::Result<()> {
    for account in store.accounts()? {
        cache.insert(&account_path(&account.account_id), render_account_row(&account));
    }

    Ok(())
}

/// Writes the account table, serving each row from the page cache.
///
/// Rows whose pages were revalidated are rendered again from the store.
pub fn write_accounts<S: Store, W: Write>(store: &S, cache: &PageCache, output: &mut W) -> anyhow::Result<()> {
    writeln!(output, "{ACCOUNT_TABLE_HEADER}")?;

    for account in store.accounts()? {
        let row = cache.get_or_render(&account_path(&account.account_id), || render_account_row(&account));
        writeln!(output, "{row}")?;
    }

    output.flush()?;

    Ok(())
}
