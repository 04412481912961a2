mod errors;
mod memory_store;
mod sqlite_store;
mod unit_of_work;

use std::collections::BTreeSet;

use crate::models::{Account, TransactionRecord, User};
use crate::types::{AccountId, Subject, TransactionId, UserId};

pub use errors::StoreError;
pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
pub use unit_of_work::{Operation, UnitOfWork};

/// Everything needed to seed a store.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<TransactionRecord>
}

/// The persistence seam.
///
/// Reads are scoped by owner wherever the caller supplies one. Writes only happen through
/// [`Store::commit`], which applies a [`UnitOfWork`] atomically: either every operation takes
/// effect or none does. Implementations serialize commits against each other and against reads.
pub trait Store: Send + Sync + 'static {
    fn find_user_by_subject(&self, subject: &Subject) -> Result<Option<User>, StoreError>;

    /// Returns the owner's transactions among `ids`, ordered by id. Unknown and foreign ids are skipped.
    fn find_transactions(&self, owner: &UserId, ids: &BTreeSet<TransactionId>) -> Result<Vec<TransactionRecord>, StoreError>;

    fn find_account(&self, owner: &UserId, account_id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// The owner's accounts ordered by id.
    fn owned_accounts(&self, owner: &UserId) -> Result<Vec<Account>, StoreError>;

    /// All accounts ordered by id.
    fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    fn import(&self, snapshot: LedgerSnapshot) -> Result<(), StoreError>;

    fn commit(&self, work: &UnitOfWork) -> Result<(), StoreError>;
}
