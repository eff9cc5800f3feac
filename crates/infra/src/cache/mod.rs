//! Cache invalidation collaborator.
//!
//! Tags are opaque strings. A job accumulates every tag it touches into one
//! `InvalidationSet` and flushes it with a single call.

mod in_memory;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use in_memory::InMemoryCacheInvalidator;

/// Deduplicated set of cache tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationSet {
    tags: BTreeSet<String>,
}

impl InvalidationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag; returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tags.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for InvalidationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalidation rejected: {0}")]
    Rejected(String),
}

/// Batched cache-tag invalidation. Must be idempotent.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, tags: &InvalidationSet) -> Result<(), CacheError>;
}

impl<C> CacheInvalidator for Arc<C>
where
    C: CacheInvalidator + ?Sized,
{
    fn invalidate(&self, tags: &InvalidationSet) -> Result<(), CacheError> {
        (**self).invalidate(tags)
    }
}
