//! HTTP transport in front of the dispatcher.
//!
//! Binds an ephemeral port and drives the router with a real client.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use insta_unfurl::http;

use super::test_helpers::{command_form, Harness, StubSource, TENANT_TOKEN, WAIT};

/// Spawn the server on an ephemeral port, returning its base URL and the
/// harness behind it.
///
/// Caller must cancel `ct` to shut the server down.
async fn spawn_server() -> (String, Harness, CancellationToken) {
    let harness = Harness::new(StubSource::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let dispatcher = Arc::clone(&harness.dispatcher);
    tokio::spawn(async move {
        let _ = http::serve(listener, dispatcher, server_ct).await;
    });

    (format!("http://{addr}"), harness, ct)
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (base, _harness, ct) = spawn_server().await;

    let response = tokio::time::timeout(WAIT, reqwest::get(format!("{base}/health")))
        .await
        .expect("request completes")
        .expect("request succeeds");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "ok");
    ct.cancel();
}

#[tokio::test]
async fn slack_endpoint_handles_form_commands() {
    let (base, harness, ct) = spawn_server().await;
    let form = command_form(
        TENANT_TOKEN,
        "/insta",
        "https://www.instagram.com/p/ABC/",
        "https://hooks.slack.com/commands/1",
    );

    let response = reqwest::Client::new()
        .post(format!("{base}/slack"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(form)
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["text"], "Fetching https://www.instagram.com/p/ABC/ ...");
    assert_eq!(harness.queue.try_receive_batch(10).await.records.len(), 1);
    ct.cancel();
}

#[tokio::test]
async fn slack_endpoint_rejects_unknown_tenant() {
    let (base, _harness, ct) = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/slack"))
        .header("content-type", "application/json")
        .body(r#"{"token":"tok-evil","challenge":"c","type":"url_verification"}"#)
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.expect("body"),
        "Bad slack api request token (tok-evil)"
    );
    ct.cancel();
}

#[tokio::test]
async fn invoke_endpoint_returns_web_envelope() {
    let (base, _harness, ct) = spawn_server().await;
    let envelope = serde_json::json!({
        "headers": {"Content-Type": "text/csv"},
        "body": "a,b",
        "isBase64Encoded": false,
    });

    let response = reqwest::Client::new()
        .post(format!("{base}/invoke"))
        .body(envelope.to_string())
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["body"], "Unsupported request");
    ct.cancel();
}

#[tokio::test]
async fn invoke_endpoint_accepts_queue_batches_without_body() {
    let (base, harness, ct) = spawn_server().await;
    let batch = serde_json::json!({
        "Records": [{"messageId": "m1", "receiptHandle": "r1", "body": "garbage"}]
    });

    let response = reqwest::Client::new()
        .post(format!("{base}/invoke"))
        .body(batch.to_string())
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
    assert!(harness.sink.replies().is_empty());
    ct.cancel();
}

#[tokio::test]
async fn invoke_endpoint_rejects_unknown_payloads() {
    let (base, _harness, ct) = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/invoke"))
        .body("{}")
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(response
        .text()
        .await
        .expect("body")
        .starts_with("unsupported payload:"));
    ct.cancel();
}
