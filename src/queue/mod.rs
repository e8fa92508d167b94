//! Work queue capability, delivery batch types, and the queue consumer.

pub mod consumer;
pub mod memory;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One delivered queue message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    /// Queue-assigned message identifier.
    #[serde(default)]
    pub message_id: String,
    /// Handle that deletes this particular delivery.
    pub receipt_handle: String,
    /// Serialized [`WorkItem`](crate::models::work_item::WorkItem).
    pub body: String,
}

/// A batch of deliveries handed to a single invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueBatch {
    /// Deliveries in queue order.
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

/// Send/delete half of the queue protocol.
///
/// Receiving is the transport's concern: deliveries arrive at the
/// dispatcher as [`QueueBatch`] payloads.
pub trait WorkQueue: Send + Sync {
    /// Identity of the queue, for logging.
    fn queue_url(&self) -> &str;

    /// Enqueue a message body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Queue` if the queue rejects the message.
    fn send<'a>(&'a self, body: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Delete one delivery so it is never redelivered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Queue` if the receipt handle is unknown or the
    /// queue rejects the delete.
    fn delete<'a>(
        &'a self,
        receipt_handle: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
