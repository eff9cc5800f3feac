//! Catalog storage abstraction and the in-memory implementation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;

use promolink_core::{Entity, LangCode, ProductId, Sku};

use crate::product::{LocalizedRecord, ProductRecord};

/// Catalog store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The backend cannot serve any request right now (connection lost, pool exhausted).
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    /// A write lost a concurrency race.
    #[error("write conflict: {0}")]
    Conflict(String),
    /// The backend refused this particular write.
    #[error("write rejected: {0}")]
    Rejected(String),
    /// A read for one record failed.
    #[error("lookup failed: {0}")]
    Lookup(String),
}

impl CatalogError {
    /// Whether the failure affects every subsequent request, not just this record.
    pub fn is_systemic(&self) -> bool {
        matches!(self, CatalogError::Unavailable(_))
    }
}

/// Product catalog collaborator.
///
/// Implementations own their concurrency control; callers assume last-write-wins.
pub trait CatalogStore: Send + Sync {
    /// Resolve a product by SKU. `Ok(None)` means the SKU is unknown.
    fn lookup(&self, sku: &Sku) -> Result<Option<ProductRecord>, CatalogError>;

    /// Persist the primary record.
    fn save(&self, record: &ProductRecord) -> Result<(), CatalogError>;

    /// List the localized views of a record (excluding the primary language).
    fn translations(&self, record: &ProductRecord) -> Result<Vec<LocalizedRecord>, CatalogError>;

    /// Persist one localized view.
    fn save_translation(&self, translation: &LocalizedRecord) -> Result<(), CatalogError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn lookup(&self, sku: &Sku) -> Result<Option<ProductRecord>, CatalogError> {
        (**self).lookup(sku)
    }

    fn save(&self, record: &ProductRecord) -> Result<(), CatalogError> {
        (**self).save(record)
    }

    fn translations(&self, record: &ProductRecord) -> Result<Vec<LocalizedRecord>, CatalogError> {
        (**self).translations(record)
    }

    fn save_translation(&self, translation: &LocalizedRecord) -> Result<(), CatalogError> {
        (**self).save_translation(translation)
    }
}

fn poisoned() -> CatalogError {
    CatalogError::Unavailable("catalog lock poisoned".to_string())
}

const SEED_POISONED: &str = "in-memory catalog lock poisoned while seeding";

/// In-memory catalog for tests/dev, with fault injection.
///
/// Seeding and fault-injection helpers panic on a poisoned lock; the
/// `CatalogStore` methods report it as `CatalogError::Unavailable`.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    products: RwLock<HashMap<Sku, ProductRecord>>,
    translations: RwLock<HashMap<ProductId, BTreeMap<LangCode, LocalizedRecord>>>,
    failing_lookups: RwLock<HashSet<Sku>>,
    failing_saves: RwLock<HashSet<Sku>>,
    failing_translation_saves: RwLock<HashSet<(ProductId, LangCode)>>,
    unavailable: AtomicBool,
    saves: AtomicUsize,
    translation_saves: AtomicUsize,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed a primary record (replaces any record with the same SKU).
    pub fn insert(&self, record: ProductRecord) {
        self.products
            .write()
            .expect(SEED_POISONED)
            .insert(record.sku().clone(), record);
    }

    /// Seed a localized view for an existing or future product.
    pub fn insert_translation(&self, translation: LocalizedRecord) {
        self.translations
            .write()
            .expect(SEED_POISONED)
            .entry(translation.product_id().clone())
            .or_default()
            .insert(translation.lang().clone(), translation);
    }

    /// Current stored copy of a product.
    pub fn get(&self, sku: &Sku) -> Option<ProductRecord> {
        self.products.read().ok()?.get(sku).cloned()
    }

    /// Current stored copy of one translation.
    pub fn translation(&self, product_id: &ProductId, lang: &LangCode) -> Option<LocalizedRecord> {
        self.translations
            .read()
            .ok()?
            .get(product_id)
            .and_then(|langs| langs.get(lang))
            .cloned()
    }

    /// Number of successful primary saves.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of successful translation saves.
    pub fn translation_saves(&self) -> usize {
        self.translation_saves.load(Ordering::SeqCst)
    }

    /// Make every operation fail with `CatalogError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make lookups of `sku` fail with `CatalogError::Lookup`.
    pub fn fail_lookups_for(&self, sku: impl Into<Sku>) {
        self.failing_lookups
            .write()
            .expect(SEED_POISONED)
            .insert(sku.into());
    }

    /// Make primary saves of `sku` fail with `CatalogError::Rejected`.
    pub fn fail_saves_for(&self, sku: impl Into<Sku>) {
        self.failing_saves
            .write()
            .expect(SEED_POISONED)
            .insert(sku.into());
    }

    /// Make saves of one translation fail with `CatalogError::Rejected`.
    pub fn fail_translation_saves_for(
        &self,
        product_id: impl Into<ProductId>,
        lang: impl Into<LangCode>,
    ) {
        self.failing_translation_saves
            .write()
            .expect(SEED_POISONED)
            .insert((product_id.into(), lang.into()));
    }

    /// Clear all injected faults.
    pub fn heal(&self) {
        self.set_unavailable(false);
        self.failing_lookups.write().expect(SEED_POISONED).clear();
        self.failing_saves.write().expect(SEED_POISONED).clear();
        self.failing_translation_saves
            .write()
            .expect(SEED_POISONED)
            .clear();
    }

    fn ensure_available(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog offline".to_string()));
        }
        Ok(())
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn lookup(&self, sku: &Sku) -> Result<Option<ProductRecord>, CatalogError> {
        self.ensure_available()?;
        if self.failing_lookups.read().map_err(|_| poisoned())?.contains(sku) {
            return Err(CatalogError::Lookup(format!("lookup of {sku} failed")));
        }
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(sku).cloned())
    }

    fn save(&self, record: &ProductRecord) -> Result<(), CatalogError> {
        self.ensure_available()?;
        if self
            .failing_saves
            .read()
            .map_err(|_| poisoned())?
            .contains(record.sku())
        {
            return Err(CatalogError::Rejected(format!("save of {} refused", record.sku())));
        }

        let mut stored = record.clone();
        stored.mark_saved(Utc::now());

        let mut products = self.products.write().map_err(|_| poisoned())?;
        products.insert(stored.sku().clone(), stored);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn translations(&self, record: &ProductRecord) -> Result<Vec<LocalizedRecord>, CatalogError> {
        self.ensure_available()?;
        let map = self.translations.read().map_err(|_| poisoned())?;
        Ok(map
            .get(record.id())
            .map(|langs| langs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn save_translation(&self, translation: &LocalizedRecord) -> Result<(), CatalogError> {
        self.ensure_available()?;
        let key = (translation.product_id().clone(), translation.lang().clone());
        if self
            .failing_translation_saves
            .read()
            .map_err(|_| poisoned())?
            .contains(&key)
        {
            return Err(CatalogError::Rejected(format!(
                "save of {} [{}] refused",
                key.0, key.1
            )));
        }

        let mut stored = translation.clone();
        stored.mark_saved();

        let mut map = self.translations.write().map_err(|_| poisoned())?;
        map.entry(key.0).or_default().insert(key.1, stored);
        self.translation_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
