//! Single entry point for every invocation.
//!
//! A raw payload is decoded into an [`Invocation`] by two independent
//! structural checks: a web request envelope with a non-empty body, then a
//! queue batch with at least one record. Web requests are further routed
//! by content type: form submissions are slash commands; JSON bodies are
//! either a URL verification handshake or an event callback. Every web
//! sub-path runs the same tenant gate before doing any work.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::models::slack_event::{ChallengeRequest, EventCallback};
use crate::queue::consumer::QueueConsumer;
use crate::queue::QueueBatch;
use crate::slack::blocks::{self, ReplyMessage};
use crate::slack::commands::{self, CommandForm};
use crate::slack::events;
use crate::state::AppState;
use crate::{AppError, Result};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Synchronous web request envelope, already stripped of transport detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebRequest {
    /// Request headers; names are matched case-insensitively.
    #[serde(default, deserialize_with = "nullable_map")]
    pub headers: HashMap<String, String>,
    /// Request body.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is base64 encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl WebRequest {
    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Media type of the body, without parameters.
    #[must_use]
    pub fn content_type(&self) -> String {
        self.header("content-type")
            .and_then(|value| value.split(';').next())
            .map(|media| media.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn decoded_body(&self) -> Result<String> {
        let raw = self.body.as_deref().unwrap_or_default();
        if !self.is_base64_encoded {
            return Ok(raw.to_owned());
        }
        let bytes = STANDARD
            .decode(raw)
            .map_err(|err| AppError::Validation(format!("base64 decode failed: {err}")))?;
        String::from_utf8(bytes)
            .map_err(|err| AppError::Validation(format!("body is not utf-8: {err}")))
    }
}

fn nullable_map<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Synchronous web response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebResponse {
    /// HTTP status.
    pub status_code: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl WebResponse {
    /// Response with an explicit content type.
    #[must_use]
    pub fn new(status_code: u16, content_type: &str, body: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: HashMap::from([("content-type".to_owned(), content_type.to_owned())]),
            body: body.into(),
        }
    }

    /// Plain-text response.
    #[must_use]
    pub fn text(status_code: u16, body: impl Into<String>) -> Self {
        Self::new(status_code, TEXT_CONTENT_TYPE, body)
    }

    /// JSON-encoded Slack message response.
    #[must_use]
    pub fn slack_message(status_code: u16, message: &ReplyMessage) -> Self {
        match serde_json::to_string(message) {
            Ok(json) => Self::new(status_code, JSON_CONTENT_TYPE, json),
            Err(err) => {
                error!(%err, "failed to encode slack message response");
                Self::text(500, "")
            }
        }
    }

    /// JSON-encoded ephemeral text response.
    #[must_use]
    pub fn slack_text(status_code: u16, text: impl Into<String>) -> Self {
        Self::slack_message(status_code, &blocks::ephemeral(text))
    }
}

/// A decoded invocation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Synchronous request expecting a response.
    Web(WebRequest),
    /// Queue deliveries; no response body.
    Queue(QueueBatch),
}

impl Invocation {
    /// Classify a raw payload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnsupportedPayload` when neither shape matches.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if let Ok(request) = serde_json::from_slice::<WebRequest>(raw) {
            if request.body.as_deref().is_some_and(|body| !body.is_empty()) {
                return Ok(Self::Web(request));
            }
        }

        if let Ok(batch) = serde_json::from_slice::<QueueBatch>(raw) {
            if !batch.records.is_empty() {
                return Ok(Self::Queue(batch));
            }
        }

        Err(AppError::UnsupportedPayload(
            "payload is neither a web request nor a queue batch".into(),
        ))
    }
}

/// Routes invocations to the command, event, and queue paths.
pub struct Dispatcher {
    state: Arc<AppState>,
    consumer: QueueConsumer,
}

impl Dispatcher {
    /// Create a dispatcher over shared state and a queue consumer.
    #[must_use]
    pub fn new(state: Arc<AppState>, consumer: QueueConsumer) -> Self {
        Self { state, consumer }
    }

    /// Handle one raw invocation payload.
    ///
    /// Web requests return the encoded [`WebResponse`]; queue batches are
    /// fully processed and return `None`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnsupportedPayload` for unrecognised payloads.
    pub async fn dispatch(&self, raw: &[u8]) -> Result<Option<Vec<u8>>> {
        match Invocation::decode(raw) {
            Ok(Invocation::Web(request)) => {
                let response = self.handle_web_request(&request).await;
                serde_json::to_vec(&response).map(Some).map_err(|err| {
                    AppError::Io(format!("failed to encode web response: {err}"))
                })
            }
            Ok(Invocation::Queue(batch)) => {
                self.consumer.consume_batch(&batch).await;
                Ok(None)
            }
            Err(err) => {
                error!(%err, "unsupported invocation payload");
                Err(err)
            }
        }
    }

    /// Handle a synchronous web request.
    pub async fn handle_web_request(&self, request: &WebRequest) -> WebResponse {
        let body = match request.decoded_body() {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "bad api request body");
                return WebResponse::slack_text(400, "Bad api request body (base64 decode fail)");
            }
        };

        let content_type = request.content_type();
        info!(content_type = %content_type, body_len = body.len(), "api request");

        match content_type.as_str() {
            FORM_CONTENT_TYPE => return self.handle_form_request(&body).await,
            JSON_CONTENT_TYPE => {
                if let Some(response) = self.handle_json_request(&body).await {
                    return response;
                }
                warn!("unsupported json request");
            }
            _ => {}
        }

        info!(content_type = %content_type, "unhandled request");
        WebResponse::text(400, "Unsupported request")
    }

    async fn handle_form_request(&self, body: &str) -> WebResponse {
        let form = CommandForm::parse(body);

        if let Err(err) = self.state.config.authorize_tenant(&form.token) {
            return WebResponse::slack_text(400, rejection_text(err));
        }

        if form.command != self.state.config.slash_command {
            warn!(command = %form.command, "unexpected slash command");
            return WebResponse::slack_text(
                400,
                format!("Unexpected slack api /command ({})", form.command),
            );
        }

        let reply = commands::handle_command(&form, &self.state).await;
        WebResponse::slack_message(200, &reply)
    }

    async fn handle_json_request(&self, body: &str) -> Option<WebResponse> {
        if let Some(challenge) = ChallengeRequest::parse(body) {
            if let Err(err) = self.state.config.authorize_tenant(&challenge.token) {
                return Some(WebResponse::text(400, rejection_text(err)));
            }
            info!("answering url verification challenge");
            return Some(WebResponse::text(200, challenge.challenge));
        }

        if let Some(callback) = EventCallback::parse(body) {
            if let Err(err) = self.state.config.authorize_tenant(&callback.token) {
                return Some(WebResponse::text(400, rejection_text(err)));
            }
            return Some(match events::handle_event(&callback, &self.state).await {
                Ok(()) => WebResponse::text(200, "Handling event"),
                Err(err) => {
                    warn!(%err, "error handling event");
                    WebResponse::text(500, "Error handling event")
                }
            });
        }

        None
    }
}

/// User-facing text of a gate rejection.
fn rejection_text(err: AppError) -> String {
    match err {
        AppError::Validation(text) => text,
        other => other.to_string(),
    }
}
