mod page_cache;

use thiserror::Error;

use crate::types::AccountId;

pub use page_cache::PageCache;

pub const DASHBOARD_PATH: &str = "/dashboard";

pub fn account_path(account_id: &AccountId) -> String {
    format!("/account/{account_id}")
}

#[derive(Debug, Error)]
#[error("Cache invalidation failed for [{path}]: {reason}")]
pub struct CacheError {
    pub path: String,
    pub reason: String
}

/// Marks previously rendered pages as stale after a mutation.
///
/// Callers treat failures as non-fatal: they are logged and never undo the mutation.
pub trait CacheNotifier: Send + Sync + 'static {
    fn revalidate(&self, path: &str) -> Result<(), CacheError>;
}
