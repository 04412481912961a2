use std::sync::Arc;

use moka::sync::Cache;
use tracing::trace;

use crate::cache::{CacheError, CacheNotifier};

/// Bounded cache of rendered pages keyed by logical path.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<String, Arc<str>>
}

impl PageCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            pages: Cache::new(capacity)
        }
    }

    /// Returns the cached page, rendering and caching it first if absent.
    pub fn get_or_render(&self, path: &str, render: impl FnOnce() -> String) -> Arc<str> {
        self.pages.get_with(path.to_string(), || Arc::from(render()))
    }

    pub fn insert(&self, path: &str, page: String) {
        self.pages.insert(path.to_string(), Arc::from(page));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }
}

impl CacheNotifier for PageCache {
    fn revalidate(&self, path: &str) -> Result<(), CacheError> {
        trace!("Revalidating [{path}]");
        self.pages.invalidate(path);
        Ok(())
    }
}
