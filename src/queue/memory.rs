//! In-process [`WorkQueue`] used by the standalone server and in tests.
//!
//! Messages wait in an unbounded channel until received. A received message
//! moves to the in-flight table under a fresh receipt handle and stays there
//! until deleted, the same receive-then-delete protocol a managed queue
//! exposes.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;
use uuid::Uuid;

use super::{QueueBatch, QueueRecord, WorkQueue};
use crate::{AppError, Result};

/// A message waiting to be received.
#[derive(Debug)]
struct Pending {
    message_id: String,
    body: String,
}

/// Channel-backed queue with an in-flight receipt table.
pub struct MemoryQueue {
    queue_url: String,
    ready_tx: mpsc::UnboundedSender<Pending>,
    ready_rx: AsyncMutex<mpsc::UnboundedReceiver<Pending>>,
    in_flight: Mutex<HashMap<String, QueueRecord>>,
}

impl MemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new(queue_url: impl Into<String>) -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        Self {
            queue_url: queue_url.into(),
            ready_tx,
            ready_rx: AsyncMutex::new(ready_rx),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for at least one message, then drain up to `max` ready messages
    /// into a delivery batch.
    pub async fn receive_batch(&self, max: usize) -> QueueBatch {
        let mut rx = self.ready_rx.lock().await;
        let mut received = Vec::new();

        // The sender lives in `self`, so the channel never closes here.
        if let Some(first) = rx.recv().await {
            received.push(first);
        }
        while received.len() < max.max(1) {
            match rx.try_recv() {
                Ok(next) => received.push(next),
                Err(_) => break,
            }
        }

        QueueBatch {
            records: received.into_iter().map(|p| self.mark_in_flight(p)).collect(),
        }
    }

    /// Drain whatever is ready without waiting; empty when nothing is.
    pub async fn try_receive_batch(&self, max: usize) -> QueueBatch {
        let mut rx = self.ready_rx.lock().await;
        let mut records = Vec::new();
        while records.len() < max {
            match rx.try_recv() {
                Ok(next) => records.push(self.mark_in_flight(next)),
                Err(_) => break,
            }
        }
        QueueBatch { records }
    }

    /// Number of received-but-undeleted deliveries.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn mark_in_flight(&self, pending: Pending) -> QueueRecord {
        let record = QueueRecord {
            message_id: pending.message_id,
            receipt_handle: Uuid::new_v4().to_string(),
            body: pending.body,
        };
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.receipt_handle.clone(), record.clone());
        record
    }
}

impl WorkQueue for MemoryQueue {
    fn queue_url(&self) -> &str {
        &self.queue_url
    }

    fn send<'a>(&'a self, body: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let message_id = Uuid::new_v4().to_string();
            debug!(queue = %self.queue_url, %message_id, "enqueueing message");
            self.ready_tx
                .send(Pending { message_id, body })
                .map_err(|err| AppError::Queue(format!("failed to enqueue message: {err}")))
        })
    }

    fn delete<'a>(
        &'a self,
        receipt_handle: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let removed = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(receipt_handle);
            match removed {
                Some(_) => Ok(()),
                None => Err(AppError::Queue(format!(
                    "unknown receipt handle {receipt_handle}"
                ))),
            }
        })
    }
}
