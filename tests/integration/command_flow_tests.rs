//! Slash command end to end: acknowledgement, queue hop, public reply.

use std::sync::Arc;

use insta_unfurl::models::work_item::WorkItem;
use insta_unfurl::queue::consumer::{Disposition, QueueConsumer};
use slack_morphism::prelude::SlackMessageResponseType;

use super::test_helpers::{command_form, sample_record, Harness, StubSource, TENANT_TOKEN};

const FORM: &str = "application/x-www-form-urlencoded";
const POST: &str = "https://www.instagram.com/p/ABC/";
const RESPONSE_URL: &str = "https://hooks.slack.com/commands/1/2/3";

#[tokio::test]
async fn command_is_acknowledged_then_answered_publicly() {
    let harness = Harness::new(StubSource::default().with(POST, sample_record(POST, 3)));
    let body = command_form(TENANT_TOKEN, "/insta", &format!("{POST} 2"), RESPONSE_URL);

    let response = harness.web(FORM, &body).await;

    assert_eq!(response.status_code, 200);
    let ack: serde_json::Value = serde_json::from_str(&response.body).expect("json body");
    assert_eq!(ack["response_type"], "ephemeral");
    assert_eq!(ack["text"], "Fetching https://www.instagram.com/p/ABC/ ...");
    assert!(harness.sink.replies().is_empty(), "no reply before the queue hop");

    assert_eq!(harness.drain_queue().await, 1);

    assert_eq!(harness.source.calls(), [(POST.to_owned(), 1)]);
    let replies = harness.sink.replies();
    assert_eq!(replies.len(), 1);
    let (target, reply) = &replies[0];
    assert_eq!(target, RESPONSE_URL);
    assert_eq!(reply.response_type, SlackMessageResponseType::InChannel);
    assert_eq!(reply.text, "<@U123> shared this instagram post (3 parts)");
    assert_eq!(reply.attachments[0].image_url, "https://cdn.example/2.jpg");
    assert_eq!(reply.attachments[0].author_name.as_deref(), Some("alice"));
    assert_eq!(harness.queue.in_flight_count(), 0);
}

#[tokio::test]
async fn invalid_command_text_replies_with_usage_and_queues_nothing() {
    let harness = Harness::new(StubSource::default());
    let body = command_form(TENANT_TOKEN, "/insta", "https://example.com/x", RESPONSE_URL);

    let response = harness.web(FORM, &body).await;

    assert_eq!(response.status_code, 200);
    let ack: serde_json::Value = serde_json::from_str(&response.body).expect("json body");
    assert_eq!(
        ack["text"],
        "Usage: `/insta <instagram-url> [photo-number](optional)`"
    );
    assert_eq!(harness.drain_queue().await, 0);
}

#[tokio::test]
async fn insecure_response_url_is_refused() {
    let harness = Harness::new(StubSource::default());
    let body = command_form(TENANT_TOKEN, "/insta", POST, "http://hooks.slack.com/commands/1");

    let response = harness.web(FORM, &body).await;

    let ack: serde_json::Value = serde_json::from_str(&response.body).expect("json body");
    assert_eq!(ack["text"], "bad request (response_url)");
    assert_eq!(harness.drain_queue().await, 0);
}

#[tokio::test]
async fn fetch_failure_sends_ephemeral_notice() {
    let harness = Harness::new(StubSource::default());
    let body = command_form(TENANT_TOKEN, "/insta", POST, RESPONSE_URL);

    harness.web(FORM, &body).await;
    harness.drain_queue().await;

    let replies = harness.sink.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].1.response_type, SlackMessageResponseType::Ephemeral);
    assert_eq!(replies[0].1.text, "Error fetching data from instagram");
}

#[tokio::test]
async fn stale_command_is_dropped_silently() {
    let harness = Harness::new(StubSource::default().with(POST, sample_record(POST, 1)));
    let body = command_form(TENANT_TOKEN, "/insta", POST, RESPONSE_URL);
    harness.web(FORM, &body).await;

    let batch = harness.queue.try_receive_batch(10).await;
    let item = WorkItem::decode(&batch.records[0].body).expect("queued work item");
    let consumer = QueueConsumer::new(
        Arc::clone(&harness.queue) as _,
        Arc::clone(&harness.state) as _,
        harness.state.config.max_lag(),
    );

    let later = item.created_at + chrono::Duration::seconds(31);
    let disposition = consumer.consume_at(&batch.records[0], later).await;

    assert_eq!(disposition, Disposition::Stale);
    assert!(harness.source.calls().is_empty());
    assert!(harness.sink.replies().is_empty());
    assert_eq!(harness.queue.in_flight_count(), 0);
}

#[tokio::test]
async fn enqueue_failure_is_reported_to_the_requester() {
    let harness =
        Harness::with_failing_queue(StubSource::default().with(POST, sample_record(POST, 1)));
    let body = command_form(TENANT_TOKEN, "/insta", POST, RESPONSE_URL);

    let response = harness.web(FORM, &body).await;

    assert_eq!(response.status_code, 200);
    let ack: serde_json::Value = serde_json::from_str(&response.body).expect("json body");
    assert_eq!(ack["response_type"], "ephemeral");
    assert_eq!(ack["text"], "Failed to enqueue request");
    assert!(harness.source.calls().is_empty());
    assert!(harness.sink.replies().is_empty());
}
