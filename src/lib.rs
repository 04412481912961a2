//! Balance bookkeeping for a personal-finance ledger.
//!
//! [`reconciler::Reconciler`] deletes batches of transactions while keeping every account's
//! balance equal to the signed sum of its remaining transactions, and keeps a single default
//! account per user. Persistence, identity and page caching are injected through the
//! [`storage::Store`], [`identity::IdentityProvider`] and [`cache::CacheNotifier`] traits.
pub mod cache;
pub mod config;
pub mod engine;
pub mod identity;
pub mod models;
pub mod reconciler;
pub mod storage;
pub mod types;
