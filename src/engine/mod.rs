mod batch_engine;
mod ledger;
mod report;
#[cfg(test)]
mod tests;

pub use batch_engine::{BatchEngine, BatchSummary, OperationKind, OperationRow};
pub use ledger::{load_ledger, read_ledger, LedgerError};
pub use report::{render_account_row, warm_cache, write_accounts, ACCOUNT_TABLE_HEADER};
