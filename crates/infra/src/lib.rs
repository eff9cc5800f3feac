//! Infrastructure layer: the promotion detach worker and its collaborators.

pub mod cache;
pub mod config;
pub mod detach;
pub mod jobs;

#[cfg(test)]
mod integration_tests;

pub use cache::{CacheError, CacheInvalidator, InMemoryCacheInvalidator, InvalidationSet};
pub use config::{CacheFailurePolicy, ConfigError, DetachConfig};
pub use detach::{DetachError, DetachJob, DetachOutcome, DetachProcessor};
pub use jobs::{
    BatchReport, DetachPayload, DetachWorker, Disposition, QueueItem, QueueItemId, QueueWorker,
    WorkerError, process_batch,
};
