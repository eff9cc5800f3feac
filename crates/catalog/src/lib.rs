//! Catalog module: product records and their promotion associations.
//!
//! The domain types here are plain data with deterministic mutation helpers.
//! Persistence is reached only through the `CatalogStore` trait; the
//! in-memory implementation exists for tests and local development.

pub mod product;
pub mod store;

pub use product::{LocalizedRecord, ProductRecord, PromotionAssociations, PromotionRef};
pub use store::{CatalogError, CatalogStore, InMemoryCatalogStore};
