//! Queue worker contract and the batch runner.

use tracing::{debug, error, info, warn};

use promolink_catalog::CatalogStore;

use crate::cache::CacheInvalidator;
use crate::detach::{DetachError, DetachJob, DetachProcessor};

use super::types::{DetachPayload, Disposition, QueueItem, QueueItemId};

/// Worker failure, classified by how the host queue should react.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The payload cannot be decoded; redelivery will not help.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// This item failed; redeliver it later.
    #[error("retryable failure: {0}")]
    Retry(String),
    /// The failure will affect every following item of this queue.
    #[error("queue suspended: {0}")]
    Suspend(String),
}

impl WorkerError {
    pub fn disposition(&self) -> Disposition {
        match self {
            WorkerError::Malformed(reason) => Disposition::Discard {
                reason: reason.clone(),
            },
            WorkerError::Retry(reason) => Disposition::Retry {
                reason: reason.clone(),
            },
            WorkerError::Suspend(reason) => Disposition::Suspend {
                reason: reason.clone(),
            },
        }
    }
}

impl From<DetachError> for WorkerError {
    fn from(e: DetachError) -> Self {
        if e.is_systemic() {
            WorkerError::Suspend(e.to_string())
        } else {
            WorkerError::Retry(e.to_string())
        }
    }
}

/// Processes single items delivered by a host queue.
pub trait QueueWorker: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn process_item(&self, item: &QueueItem) -> Result<(), WorkerError>;
}

/// `QueueWorker` running the promotion detach job.
#[derive(Debug)]
pub struct DetachWorker<S, C> {
    processor: DetachProcessor<S, C>,
}

impl<S: CatalogStore, C: CacheInvalidator> DetachWorker<S, C> {
    pub const NAME: &'static str = "promotion_detach";

    pub fn new(processor: DetachProcessor<S, C>) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &DetachProcessor<S, C> {
        &self.processor
    }
}

impl<S: CatalogStore, C: CacheInvalidator> QueueWorker for DetachWorker<S, C> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process_item(&self, item: &QueueItem) -> Result<(), WorkerError> {
        let job: DetachJob = DetachPayload::decode(&item.payload)
            .map_err(|e| WorkerError::Malformed(e.to_string()))?
            .into();

        let outcome = self.processor.process(&job)?;
        debug!(
            item_id = %item.id,
            attempt = item.attempt,
            detached = outcome.detached.len(),
            unresolved = outcome.unresolved.len(),
            "detach item processed"
        );
        Ok(())
    }
}

/// Per-item results of one `process_batch` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<(QueueItemId, Disposition)>,
    /// Items not attempted because the queue was suspended.
    pub unattempted: Vec<QueueItemId>,
}

impl BatchReport {
    pub fn suspended(&self) -> bool {
        !self.unattempted.is_empty()
            || matches!(self.results.last(), Some((_, Disposition::Suspend { .. })))
    }

    pub fn count(&self, pred: impl Fn(&Disposition) -> bool) -> usize {
        self.results.iter().filter(|(_, d)| pred(d)).count()
    }
}

/// Run `worker` over delivered items in order.
///
/// Stops at the first `Suspend`; later items are reported as unattempted and
/// stay queued. Nothing is acknowledged here; the host applies the report.
pub fn process_batch<W>(worker: &W, items: &[QueueItem]) -> BatchReport
where
    W: QueueWorker + ?Sized,
{
    let mut report = BatchReport::default();

    for (idx, item) in items.iter().enumerate() {
        let disposition = match worker.process_item(item) {
            Ok(()) => Disposition::Ack,
            Err(e) => {
                match &e {
                    WorkerError::Malformed(_) => error!(
                        worker = worker.name(),
                        item_id = %item.id,
                        error = %e,
                        "discarding queue item"
                    ),
                    WorkerError::Retry(_) => warn!(
                        worker = worker.name(),
                        item_id = %item.id,
                        attempt = item.attempt,
                        error = %e,
                        "queue item will be retried"
                    ),
                    WorkerError::Suspend(_) => error!(
                        worker = worker.name(),
                        item_id = %item.id,
                        error = %e,
                        "suspending queue"
                    ),
                }
                e.disposition()
            }
        };

        let suspend = matches!(disposition, Disposition::Suspend { .. });
        report.results.push((item.id, disposition));

        if suspend {
            report.unattempted = items[idx + 1..].iter().map(|i| i.id).collect();
            break;
        }
    }

    info!(
        worker = worker.name(),
        processed = report.results.len(),
        acked = report.count(|d| matches!(d, Disposition::Ack)),
        unattempted = report.unattempted.len(),
        "queue batch finished"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use promolink_catalog::{InMemoryCatalogStore, ProductRecord};
    use promolink_core::Sku;

    use crate::cache::InMemoryCacheInvalidator;

    fn worker() -> (
        DetachWorker<Arc<InMemoryCatalogStore>, Arc<InMemoryCacheInvalidator>>,
        Arc<InMemoryCatalogStore>,
    ) {
        let catalog = InMemoryCatalogStore::arc();
        catalog.insert(
            ProductRecord::new("SKU1", "SKU1", "Shirt")
                .with_promotions([42u64, 7].into_iter().collect()),
        );
        let processor =
            DetachProcessor::new(catalog.clone(), Arc::new(InMemoryCacheInvalidator::new()));
        (DetachWorker::new(processor), catalog)
    }

    fn item(skus: &[&str], promotion: u64) -> QueueItem {
        QueueItem::new(json!({"skus": skus, "promotion": promotion, "promotion_type": "cart"}))
    }

    #[test]
    fn successful_item_is_acked() {
        let (worker, catalog) = worker();

        let report = process_batch(&worker, &[item(&["SKU1", "SKU9"], 42)]);

        assert_eq!(report.results[0].1, Disposition::Ack);
        assert!(!report.suspended());
        let record = catalog.get(&Sku::from("SKU1")).unwrap();
        assert_eq!(record.promotions().len(), 1);
    }

    #[test]
    fn malformed_item_is_discarded_and_batch_continues() {
        let (worker, _catalog) = worker();
        let items = vec![QueueItem::new(json!({"promotion": 42})), item(&["SKU1"], 42)];

        let report = process_batch(&worker, &items);

        assert!(matches!(report.results[0].1, Disposition::Discard { .. }));
        assert_eq!(report.results[1].1, Disposition::Ack);
    }

    #[test]
    fn save_failure_is_retried() {
        let (worker, catalog) = worker();
        catalog.fail_saves_for("SKU1");

        let report = process_batch(&worker, &[item(&["SKU1"], 42)]);

        assert!(matches!(report.results[0].1, Disposition::Retry { .. }));
        assert!(!report.results[0].1.removes_item());
    }

    #[test]
    fn unavailable_catalog_suspends_remaining_items() {
        let (worker, catalog) = worker();
        catalog.set_unavailable(true);
        let items = vec![item(&["SKU1"], 42), item(&["SKU1"], 7), item(&[], 8)];

        let report = process_batch(&worker, &items);

        assert_eq!(report.results.len(), 1);
        assert!(matches!(report.results[0].1, Disposition::Suspend { .. }));
        assert_eq!(report.unattempted, vec![items[1].id, items[2].id]);
        assert!(report.suspended());
    }

    #[test]
    fn detach_error_maps_to_worker_error() {
        use promolink_catalog::CatalogError;

        let soft = DetachError::Persist {
            sku: Sku::from("SKU1"),
            source: CatalogError::Conflict("stale".into()),
        };
        let hard = DetachError::Persist {
            sku: Sku::from("SKU1"),
            source: CatalogError::Unavailable("down".into()),
        };

        assert!(matches!(WorkerError::from(soft), WorkerError::Retry(_)));
        assert!(matches!(WorkerError::from(hard), WorkerError::Suspend(_)));
    }
}
