//! Job-source boundary for the detach worker.
//!
//! The host queue owns claiming, leasing, scheduling and acknowledgment.
//! This module only decodes delivered items, runs them, and tells the host
//! what to do with each one via `Disposition`:
//!
//! - `Ack`: processed; remove the item.
//! - `Retry`: leave it queued for redelivery (at-least-once).
//! - `Suspend`: retry it, and stop draining this queue for the current run.
//! - `Discard`: the payload can never succeed; drop it.

pub mod types;
pub mod worker;

pub use types::{DetachPayload, Disposition, QueueItem, QueueItemId};
pub use worker::{BatchReport, DetachWorker, QueueWorker, WorkerError, process_batch};
