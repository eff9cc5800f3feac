use tracing::{debug, info, info_span, warn};

use promolink_catalog::{CatalogStore, ProductRecord};
use promolink_core::{Entity, ProductId, PromotionId, Sku};

use crate::cache::{CacheInvalidator, InvalidationSet};
use crate::config::{CacheFailurePolicy, DetachConfig};

use super::types::{DetachError, DetachJob, DetachOutcome, join_skus};

/// Removes one promotion from a batch of products.
///
/// Single-threaded and synchronous: every collaborator call blocks. Multiple
/// processors may run concurrently on different jobs; the catalog's own
/// write semantics decide races on the same product.
#[derive(Debug)]
pub struct DetachProcessor<S, C> {
    catalog: S,
    cache: C,
    config: DetachConfig,
}

impl<S: CatalogStore, C: CacheInvalidator> DetachProcessor<S, C> {
    pub fn new(catalog: S, cache: C) -> Self {
        Self {
            catalog,
            cache,
            config: DetachConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DetachConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DetachConfig {
        &self.config
    }

    pub fn catalog(&self) -> &S {
        &self.catalog
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn promotion_tag(&self, promotion_id: &PromotionId) -> String {
        format!("{}{}", self.config.promotion_tag_prefix, promotion_id)
    }

    pub fn product_tag(&self, product_id: &ProductId) -> String {
        format!("{}{}", self.config.product_tag_prefix, product_id)
    }

    /// Run one job to completion.
    ///
    /// Returns `Err` only for job-fatal failures; in that case nothing is
    /// flushed to the cache and no summary is logged.
    pub fn process(&self, job: &DetachJob) -> Result<DetachOutcome, DetachError> {
        let span = info_span!(
            "detach_promotion",
            promotion_id = %job.promotion_id,
            promotion_type = %job.promotion_type,
            skus = job.skus.len()
        );
        let _entered = span.enter();

        let mut outcome = DetachOutcome::default();
        let mut tags = InvalidationSet::new();
        tags.insert(self.promotion_tag(&job.promotion_id));

        for sku in &job.skus {
            let Some(mut record) = self.resolve(sku)? else {
                outcome.record_unresolved(sku);
                continue;
            };

            let removed = self.detach_one(sku, &mut record, &job.promotion_id)?;
            tags.insert(self.product_tag(record.id()));
            outcome.record_detached(sku, removed);
        }

        outcome.cache_flushed = self.flush(&tags)?;
        outcome.invalidated = tags;

        info!(
            promotion_id = %job.promotion_id,
            promotion_type = %job.promotion_type,
            skus = %join_skus(&job.skus),
            detached = outcome.detached.len(),
            removed = outcome.removed,
            "detached promotion from products"
        );

        if !outcome.unresolved.is_empty() {
            warn!(
                promotion_id = %job.promotion_id,
                skus = %join_skus(&outcome.unresolved),
                "products not found while detaching promotion"
            );
        }

        Ok(outcome)
    }

    /// `Ok(None)` for unknown SKUs and for lookup errors scoped to one record.
    fn resolve(&self, sku: &Sku) -> Result<Option<ProductRecord>, DetachError> {
        match self.catalog.lookup(sku) {
            Ok(found) => Ok(found),
            Err(source) if source.is_systemic() => Err(DetachError::Lookup {
                sku: sku.clone(),
                source,
            }),
            Err(source) => {
                warn!(
                    sku = %sku,
                    error = %source,
                    "lookup failed; treating product as unresolved"
                );
                Ok(None)
            }
        }
    }

    fn detach_one(
        &self,
        sku: &Sku,
        record: &mut ProductRecord,
        promotion_id: &PromotionId,
    ) -> Result<usize, DetachError> {
        let removed = record.detach_promotion(promotion_id);

        if removed > 0 || !self.config.skip_unchanged {
            self.catalog.save(record).map_err(|source| DetachError::Persist {
                sku: sku.clone(),
                source,
            })?;
        }

        let translations = self
            .catalog
            .translations(record)
            .map_err(|source| DetachError::Translations {
                sku: sku.clone(),
                source,
            })?;

        let mut synced = 0;
        for mut translation in translations {
            // A previous attempt may have saved the primary but not this
            // language, so compare against the primary rather than `removed`.
            if self.config.skip_unchanged && translation.promotions() == record.promotions() {
                continue;
            }
            translation.sync_promotions_from(record);
            self.catalog
                .save_translation(&translation)
                .map_err(|source| DetachError::PersistTranslation {
                    sku: sku.clone(),
                    lang: translation.lang().clone(),
                    source,
                })?;
            synced += 1;
        }

        debug!(sku = %sku, removed, translations = synced, "detached promotion from product");
        Ok(removed)
    }

    /// Single batched invalidation. `Ok(false)` when a failure was tolerated.
    fn flush(&self, tags: &InvalidationSet) -> Result<bool, DetachError> {
        match self.cache.invalidate(tags) {
            Ok(()) => Ok(true),
            Err(e) => match self.config.cache_failure {
                CacheFailurePolicy::Log => {
                    warn!(
                        error = %e,
                        tags = tags.len(),
                        "cache invalidation failed; entries will expire"
                    );
                    Ok(false)
                }
                CacheFailurePolicy::Fatal => Err(e.into()),
            },
        }
    }
}
