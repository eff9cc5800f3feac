use std::collections::HashSet;

use promolink_catalog::CatalogError;
use promolink_core::{LangCode, PromotionId, Sku};

use crate::cache::{CacheError, InvalidationSet};

/// One batch: detach `promotion_id` from every listed SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachJob {
    pub skus: Vec<Sku>,
    pub promotion_id: PromotionId,
    /// Carried for logging only.
    pub promotion_type: String,
}

impl DetachJob {
    pub fn new<I, S>(promotion_id: impl Into<PromotionId>, skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Sku>,
    {
        Self {
            skus: skus.into_iter().map(Into::into).collect(),
            promotion_id: promotion_id.into(),
            promotion_type: String::new(),
        }
    }

    pub fn with_promotion_type(mut self, promotion_type: impl Into<String>) -> Self {
        self.promotion_type = promotion_type.into();
        self
    }
}

/// Result of a job that ran to completion.
///
/// `detached` and `unresolved` keep first-seen input order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetachOutcome {
    pub detached: Vec<Sku>,
    pub unresolved: Vec<Sku>,
    /// Total association entries removed across primary records.
    pub removed: usize,
    /// Tags handed to the cache collaborator.
    pub invalidated: InvalidationSet,
    /// False when invalidation failed under `CacheFailurePolicy::Log`.
    pub cache_flushed: bool,
    seen_detached: HashSet<Sku>,
    seen_unresolved: HashSet<Sku>,
}

impl DetachOutcome {
    pub(crate) fn record_detached(&mut self, sku: &Sku, removed: usize) {
        self.removed += removed;
        if self.seen_detached.insert(sku.clone()) {
            self.detached.push(sku.clone());
        }
    }

    pub(crate) fn record_unresolved(&mut self, sku: &Sku) {
        if self.seen_unresolved.insert(sku.clone()) {
            self.unresolved.push(sku.clone());
        }
    }

    /// Every SKU resolved and the cache was flushed.
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.cache_flushed
    }
}

/// Job-fatal failure. The job must be redelivered as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetachError {
    #[error("catalog lookup of {sku} failed: {source}")]
    Lookup { sku: Sku, source: CatalogError },
    #[error("failed to save product {sku}: {source}")]
    Persist { sku: Sku, source: CatalogError },
    #[error("failed to list translations of {sku}: {source}")]
    Translations { sku: Sku, source: CatalogError },
    #[error("failed to save product {sku} [{lang}]: {source}")]
    PersistTranslation {
        sku: Sku,
        lang: LangCode,
        source: CatalogError,
    },
    #[error("cache invalidation failed: {0}")]
    Cache(#[from] CacheError),
}

impl DetachError {
    /// Whether the failure will hit every following job too.
    pub fn is_systemic(&self) -> bool {
        match self {
            DetachError::Lookup { source, .. }
            | DetachError::Persist { source, .. }
            | DetachError::Translations { source, .. }
            | DetachError::PersistTranslation { source, .. } => source.is_systemic(),
            DetachError::Cache(CacheError::Unavailable(_)) => true,
            DetachError::Cache(CacheError::Rejected(_)) => false,
        }
    }
}

pub(crate) fn join_skus(skus: &[Sku]) -> String {
    skus.iter().map(Sku::as_str).collect::<Vec<_>>().join(",")
}
