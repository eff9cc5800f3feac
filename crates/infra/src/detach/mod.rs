//! Detaching a promotion from a batch of products.
//!
//! ## Failure model
//!
//! - Unknown SKUs (and non-systemic lookup errors) are soft: recorded as
//!   unresolved, processing continues.
//! - Any save failure, or a catalog that reports itself unavailable, aborts
//!   the job before the cache flush. The caller leaves the item queued and
//!   redelivery re-runs the whole batch; removal is idempotent so products
//!   already saved on the failed attempt are no-ops the second time.
//! - Cache failure follows `CacheFailurePolicy`.

pub mod processor;
pub mod types;

pub use processor::DetachProcessor;
pub use types::{DetachError, DetachJob, DetachOutcome};
