use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use promolink_core::{Entity, LangCode, ProductId, PromotionId, Sku, ValueObject};

/// Reference from a product to a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromotionRef {
    pub target_id: PromotionId,
}

impl PromotionRef {
    pub fn new(target_id: impl Into<PromotionId>) -> Self {
        Self {
            target_id: target_id.into(),
        }
    }
}

impl ValueObject for PromotionRef {}

/// Promotions attached to a product, in stored order.
///
/// Uniqueness by `target_id` is the intended state, but stale data may carry
/// duplicates; `detach` removes all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromotionAssociations(Vec<PromotionRef>);

impl PromotionAssociations {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Remove every reference to `promotion_id`, returning how many were dropped.
    ///
    /// Matching is by identifier, never by position. Removing an absent
    /// promotion is a no-op returning `0`.
    pub fn detach(&mut self, promotion_id: &PromotionId) -> usize {
        let before = self.0.len();
        self.0.retain(|r| &r.target_id != promotion_id);
        before - self.0.len()
    }

    /// Append a reference (no deduplication).
    pub fn attach(&mut self, promotion_id: impl Into<PromotionId>) {
        self.0.push(PromotionRef::new(promotion_id));
    }

    pub fn contains(&self, promotion_id: &PromotionId) -> bool {
        self.0.iter().any(|r| &r.target_id == promotion_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromotionRef> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<PromotionId>> FromIterator<P> for PromotionAssociations {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(PromotionRef::new).collect())
    }
}

/// Primary (default-language) product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    id: ProductId,
    sku: Sku,
    title: String,
    promotions: PromotionAssociations,
    version: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    pub fn new(id: impl Into<ProductId>, sku: impl Into<Sku>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            title: title.into(),
            promotions: PromotionAssociations::new(),
            version: 0,
            updated_at: None,
        }
    }

    pub fn with_promotions(mut self, promotions: PromotionAssociations) -> Self {
        self.promotions = promotions;
        self
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn promotions(&self) -> &PromotionAssociations {
        &self.promotions
    }

    /// Number of successful saves this record has been through.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Remove `promotion_id` from this record's associations.
    pub fn detach_promotion(&mut self, promotion_id: &PromotionId) -> usize {
        self.promotions.detach(promotion_id)
    }

    /// Stamp the record as persisted. Called by stores on a successful save.
    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = Some(at);
    }
}

impl Entity for ProductRecord {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Per-language view of a product, persisted independently of the primary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedRecord {
    product_id: ProductId,
    lang: LangCode,
    title: String,
    promotions: PromotionAssociations,
    version: u64,
}

impl LocalizedRecord {
    pub fn new(
        product_id: impl Into<ProductId>,
        lang: impl Into<LangCode>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            lang: lang.into(),
            title: title.into(),
            promotions: PromotionAssociations::new(),
            version: 0,
        }
    }

    pub fn with_promotions(mut self, promotions: PromotionAssociations) -> Self {
        self.promotions = promotions;
        self
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn lang(&self) -> &LangCode {
        &self.lang
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn promotions(&self) -> &PromotionAssociations {
        &self.promotions
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Overwrite associations with the primary record's value.
    ///
    /// Translations never compute their own difference: they copy the
    /// primary's post-detach list so every language ends up identical.
    pub fn sync_promotions_from(&mut self, primary: &ProductRecord) {
        self.promotions = primary.promotions.clone();
    }

    pub fn mark_saved(&mut self) {
        self.version += 1;
    }
}
