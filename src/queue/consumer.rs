//! Queue consumer: decode, staleness check, route, delete.
//!
//! Every delivery is deleted exactly once after handling, whatever the
//! outcome. A crash before the delete is therefore the only way a work
//! item is seen twice.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn, Instrument};

use super::{QueueBatch, QueueRecord, WorkQueue};
use crate::models::work_item::{CommandPayload, LinkEventPayload, WorkItem, WorkPayload};

/// Queue-side processing paths for each kind of work.
pub trait WorkProcessor: Send + Sync {
    /// Fetch content and post the slash-command reply.
    fn process_command<'a>(
        &'a self,
        payload: &'a CommandPayload,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Fetch every shared link and post the unfurl.
    fn process_link_event<'a>(
        &'a self,
        payload: &'a LinkEventPayload,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// What happened to a single delivery before it was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Body could not be decoded; discarded.
    Poisoned,
    /// Older than the staleness threshold; dropped unprocessed.
    Stale,
    /// Routed to its processing path.
    Processed,
}

/// Consumes delivery batches sequentially, in delivery order.
pub struct QueueConsumer {
    queue: Arc<dyn WorkQueue>,
    processor: Arc<dyn WorkProcessor>,
    max_lag: Duration,
}

impl QueueConsumer {
    /// Create a consumer with the given staleness threshold.
    #[must_use]
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        processor: Arc<dyn WorkProcessor>,
        max_lag: Duration,
    ) -> Self {
        Self {
            queue,
            processor,
            max_lag,
        }
    }

    /// Handle every record of a batch, one after another.
    pub async fn consume_batch(&self, batch: &QueueBatch) {
        info!(records = batch.records.len(), "handling queue batch");
        for record in &batch.records {
            self.consume(record).await;
        }
    }

    /// Handle one delivery against the current time.
    pub async fn consume(&self, record: &QueueRecord) -> Disposition {
        self.consume_at(record, Utc::now()).await
    }

    /// Handle one delivery as if the current time were `now`.
    pub async fn consume_at(&self, record: &QueueRecord, now: DateTime<Utc>) -> Disposition {
        let span = info_span!("queue_delivery", message_id = %record.message_id);
        async {
            let disposition = self.route(record, now).await;
            self.delete(record).await;
            disposition
        }
        .instrument(span)
        .await
    }

    async fn route(&self, record: &QueueRecord, now: DateTime<Utc>) -> Disposition {
        let item = match WorkItem::decode(&record.body) {
            Ok(item) => item,
            Err(err) => {
                error!(%err, body = %record.body, "discarding undecodable queue message");
                return Disposition::Poisoned;
            }
        };

        let age = item.age_at(now);
        info!(
            kind = item.kind().as_str(),
            age_seconds = age.as_secs(),
            "received work item"
        );

        if age > self.max_lag {
            warn!(
                kind = item.kind().as_str(),
                age_seconds = age.as_secs(),
                max_lag_seconds = self.max_lag.as_secs(),
                "dropping stale work item"
            );
            return Disposition::Stale;
        }

        match &item.payload {
            WorkPayload::Command(payload) => self.processor.process_command(payload).await,
            WorkPayload::LinkEvent(payload) => self.processor.process_link_event(payload).await,
        }
        Disposition::Processed
    }

    async fn delete(&self, record: &QueueRecord) {
        if let Err(err) = self.queue.delete(&record.receipt_handle).await {
            error!(
                %err,
                queue = self.queue.queue_url(),
                receipt_handle = %record.receipt_handle,
                "failed to delete queue message"
            );
        }
    }
}
