use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{CacheError, CacheInvalidator, InvalidationSet};

/// In-memory invalidator for tests/dev.
///
/// Records every batch it receives so callers can assert on call count and
/// contents.
#[derive(Debug, Default)]
pub struct InMemoryCacheInvalidator {
    calls: Mutex<Vec<InvalidationSet>>,
    failing: AtomicBool,
}

impl InMemoryCacheInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with `CacheError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every batch received, in call order.
    pub fn calls(&self) -> Vec<InvalidationSet> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Union of every tag invalidated so far.
    pub fn invalidated(&self) -> BTreeSet<String> {
        self.calls()
            .iter()
            .flat_map(|set| set.iter().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }
}

impl CacheInvalidator for InMemoryCacheInvalidator {
    fn invalidate(&self, tags: &InvalidationSet) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("cache offline".to_string()));
        }
        self.calls
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))?
            .push(tags.clone());
        Ok(())
    }
}
