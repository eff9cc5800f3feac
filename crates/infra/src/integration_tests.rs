//! End-to-end tests for the detach pipeline.
//!
//! Tests: QueueItem → DetachWorker → DetachProcessor → CatalogStore + CacheInvalidator
//!
//! Verifies:
//! - Detached products lose the promotion on the primary record and every translation
//! - Unknown SKUs are reported without failing the job
//! - Redelivery after a partial failure converges to the same state

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use serde_json::json;

    use promolink_catalog::{
        InMemoryCatalogStore, LocalizedRecord, ProductRecord, PromotionAssociations,
    };
    use promolink_core::{LangCode, ProductId, PromotionId, Sku};

    use crate::cache::InMemoryCacheInvalidator;
    use crate::detach::{DetachJob, DetachProcessor};
    use crate::jobs::{DetachWorker, Disposition, QueueItem, process_batch};

    type Processor = DetachProcessor<Arc<InMemoryCatalogStore>, Arc<InMemoryCacheInvalidator>>;

    fn setup() -> (Processor, Arc<InMemoryCatalogStore>, Arc<InMemoryCacheInvalidator>) {
        let catalog = InMemoryCatalogStore::arc();
        let cache = Arc::new(InMemoryCacheInvalidator::new());
        (
            DetachProcessor::new(catalog.clone(), cache.clone()),
            catalog,
            cache,
        )
    }

    fn seed_with_translations(
        catalog: &InMemoryCatalogStore,
        sku: &str,
        promotions: &[u64],
        langs: &[&str],
    ) {
        let assoc: PromotionAssociations = promotions.iter().copied().collect();
        catalog.insert(ProductRecord::new(sku, sku, sku).with_promotions(assoc.clone()));
        for lang in langs {
            catalog.insert_translation(
                LocalizedRecord::new(sku, *lang, format!("{sku} [{lang}]"))
                    .with_promotions(assoc.clone()),
            );
        }
    }

    fn targets(catalog: &InMemoryCatalogStore, sku: &str) -> Vec<String> {
        catalog
            .get(&Sku::from(sku))
            .unwrap()
            .promotions()
            .iter()
            .map(|r| r.target_id.to_string())
            .collect()
    }

    fn tag_set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn found_and_missing_skus() {
        let (processor, catalog, cache) = setup();
        seed_with_translations(&catalog, "SKU1", &[42, 7], &[]);

        let outcome = processor
            .process(&DetachJob::new(42u64, ["SKU1", "SKU2"]))
            .unwrap();

        assert_eq!(targets(&catalog, "SKU1"), vec!["7"]);
        assert_eq!(outcome.detached, vec![Sku::from("SKU1")]);
        assert_eq!(outcome.unresolved, vec![Sku::from("SKU2")]);
        assert_eq!(cache.invalidated(), tag_set(&["promotion:42", "product:SKU1"]));
        assert!(catalog.get(&Sku::from("SKU2")).is_none());
    }

    #[test]
    fn empty_batch() {
        let (processor, catalog, cache) = setup();

        let outcome = processor
            .process(&DetachJob::new(42u64, Vec::<Sku>::new()))
            .unwrap();

        assert_eq!(catalog.saves(), 0);
        assert_eq!(cache.invalidated(), tag_set(&["promotion:42"]));
        assert!(outcome.detached.is_empty() && outcome.unresolved.is_empty());
    }

    #[test]
    fn duplicate_stale_entries_removed_in_one_pass() {
        let (processor, catalog, _cache) = setup();
        seed_with_translations(&catalog, "SKU1", &[42, 42], &[]);

        let outcome = processor.process(&DetachJob::new(42u64, ["SKU1"])).unwrap();

        assert_eq!(outcome.removed, 2);
        assert!(targets(&catalog, "SKU1").is_empty());
        assert_eq!(catalog.saves(), 1);
    }

    #[test]
    fn every_translation_matches_primary() {
        let (processor, catalog, _cache) = setup();
        seed_with_translations(&catalog, "SKU1", &[42, 7, 9], &["ar", "en", "fr"]);

        processor.process(&DetachJob::new(42u64, ["SKU1"])).unwrap();

        let primary = catalog.get(&Sku::from("SKU1")).unwrap();
        for lang in ["ar", "en", "fr"] {
            let t = catalog
                .translation(&ProductId::from("SKU1"), &LangCode::from(lang))
                .unwrap();
            assert_eq!(t.promotions(), primary.promotions(), "lang {lang}");
        }
        assert_eq!(catalog.translation_saves(), 3);
    }

    #[test]
    fn reprocessing_is_idempotent() {
        let (processor, catalog, _cache) = setup();
        seed_with_translations(&catalog, "SKU1", &[42, 7], &["fr"]);
        seed_with_translations(&catalog, "SKU2", &[3, 42], &[]);
        let job = DetachJob::new(42u64, ["SKU1", "SKU2", "SKU3"]);

        let first = processor.process(&job).unwrap();
        let state_after_first = (targets(&catalog, "SKU1"), targets(&catalog, "SKU2"));
        let second = processor.process(&job).unwrap();

        assert_eq!(state_after_first, (targets(&catalog, "SKU1"), targets(&catalog, "SKU2")));
        assert_eq!(first.detached, second.detached);
        assert_eq!(first.unresolved, second.unresolved);
        assert_eq!(first.invalidated, second.invalidated);
        assert_eq!(second.removed, 0);
    }

    #[test]
    fn redelivery_after_translation_failure_converges() {
        let (processor, catalog, cache) = setup();
        seed_with_translations(&catalog, "SKU1", &[42, 7], &["fr"]);
        seed_with_translations(&catalog, "SKU2", &[42], &[]);
        catalog.fail_translation_saves_for("SKU1", "fr");

        let worker = DetachWorker::new(processor);
        let item = QueueItem::new(json!({"skus": ["SKU1", "SKU2"], "promotion": "42"}));

        let first = process_batch(&worker, std::slice::from_ref(&item));
        assert!(matches!(first.results[0].1, Disposition::Retry { .. }));
        // primary already saved, SKU2 never reached, nothing flushed
        assert_eq!(targets(&catalog, "SKU1"), vec!["7"]);
        assert_eq!(targets(&catalog, "SKU2"), vec!["42"]);
        assert!(cache.calls().is_empty());

        catalog.heal();
        let second = process_batch(&worker, &[item.redelivered()]);
        assert_eq!(second.results[0].1, Disposition::Ack);

        let fr = catalog
            .translation(&ProductId::from("SKU1"), &LangCode::from("fr"))
            .unwrap();
        assert!(!fr.promotions().contains(&PromotionId::from(42u64)));
        assert!(targets(&catalog, "SKU2").is_empty());
        assert_eq!(
            cache.invalidated(),
            tag_set(&["promotion:42", "product:SKU1", "product:SKU2"])
        );
    }

    #[test]
    fn one_invalidation_call_per_job() {
        let (processor, catalog, cache) = setup();
        for i in 0..20 {
            seed_with_translations(&catalog, &format!("SKU{i}"), &[42], &["fr"]);
        }
        let skus: Vec<String> = (0..20).map(|i| format!("SKU{i}")).collect();

        let outcome = processor.process(&DetachJob::new(42u64, skus)).unwrap();

        assert_eq!(cache.calls().len(), 1);
        assert_eq!(outcome.invalidated.len(), 21);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: one run leaves no product referencing the promotion,
            /// and a second run changes nothing.
            #[test]
            fn processing_twice_equals_processing_once(
                products in proptest::collection::vec(
                    proptest::collection::vec(0u64..5, 0..6),
                    0..8,
                ),
                requested in proptest::collection::vec(0usize..10, 0..12),
                target in 0u64..5
            ) {
                let (processor, catalog, _cache) = setup();
                for (i, promotions) in products.iter().enumerate() {
                    seed_with_translations(&catalog, &format!("SKU{i}"), promotions, &["fr"]);
                }
                let skus: Vec<String> = requested.iter().map(|i| format!("SKU{i}")).collect();
                let job = DetachJob::new(target, skus);

                let once = processor.process(&job).unwrap();
                let snapshot: Vec<Vec<String>> =
                    (0..products.len()).map(|i| targets(&catalog, &format!("SKU{i}"))).collect();
                let twice = processor.process(&job).unwrap();
                let after: Vec<Vec<String>> =
                    (0..products.len()).map(|i| targets(&catalog, &format!("SKU{i}"))).collect();

                prop_assert_eq!(&snapshot, &after);
                prop_assert_eq!(&once.invalidated, &twice.invalidated);
                prop_assert_eq!(once.invalidated.len(), 1 + once.detached.len());
                for sku in &once.detached {
                    let record = catalog.get(sku).unwrap();
                    prop_assert!(!record.promotions().contains(&PromotionId::from(target)));
                }
                for sku in &once.unresolved {
                    prop_assert!(catalog.get(sku).is_none());
                }
            }
        }
    }
}
