//! Queue item envelope and payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use promolink_core::{PromotionId, Sku};

use crate::detach::DetachJob;

/// Identifier of a delivered queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(pub Uuid);

impl QueueItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One item as delivered by the host queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    /// Opaque payload, decoded by the worker.
    pub payload: serde_json::Value,
    /// Delivery count as reported by the host (1 on first delivery).
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: QueueItemId::new(),
            payload,
            attempt: 1,
            enqueued_at: Utc::now(),
        }
    }

    /// Serialize a typed payload into a new item.
    pub fn from_payload<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(payload)?))
    }

    /// Mark a redelivery.
    pub fn redelivered(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

/// Wire shape of an enqueued detach request.
///
/// `promotion` may arrive as an integer or a string; `promotion_type` is
/// optional and only used for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachPayload {
    pub skus: Vec<Sku>,
    #[serde(rename = "promotion")]
    pub promotion_id: PromotionId,
    #[serde(default)]
    pub promotion_type: String,
}

impl DetachPayload {
    pub fn decode(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

impl From<DetachPayload> for DetachJob {
    fn from(payload: DetachPayload) -> Self {
        DetachJob {
            skus: payload.skus,
            promotion_id: payload.promotion_id,
            promotion_type: payload.promotion_type,
        }
    }
}

impl From<&DetachJob> for DetachPayload {
    fn from(job: &DetachJob) -> Self {
        Self {
            skus: job.skus.clone(),
            promotion_id: job.promotion_id.clone(),
            promotion_type: job.promotion_type.clone(),
        }
    }
}

/// What the host queue should do with an item after processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Ack,
    Retry { reason: String },
    Suspend { reason: String },
    Discard { reason: String },
}

impl Disposition {
    /// Whether the item should be removed from the queue.
    pub fn removes_item(&self) -> bool {
        matches!(self, Disposition::Ack | Disposition::Discard { .. })
    }
}
