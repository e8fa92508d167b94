//! Queued work items and their JSON wire form.
//!
//! A [`WorkItem`] is created by the command or event handler, serialized
//! into a [`QueueMessage`], and decoded exactly once by the queue consumer.
//! The payload is a tagged union, so the kind and the populated payload can
//! never disagree in memory; the wire form is validated on decode.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use slack_morphism::prelude::{SlackChannelId, SlackTs, SlackUserId};

use super::slack_event::{EventCallback, LinkSharedEvent, SharedLink, EVENT_CALLBACK, LINK_SHARED};
use crate::{AppError, Result};

/// Wire discriminator for slash-command work.
pub const SLASH_COMMAND_TYPE: &str = "slash_command";

/// Wire discriminator for link-unfurl work.
pub const UNFURL_EVENT_TYPE: &str = "unfurl_event";

/// Kind of queued work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkKind {
    /// A `/insta` slash command awaiting its reply.
    #[serde(rename = "slash_command")]
    Command,
    /// A `link_shared` event awaiting its unfurl.
    #[serde(rename = "unfurl_event")]
    LinkEvent,
}

impl WorkKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => SLASH_COMMAND_TYPE,
            Self::LinkEvent => UNFURL_EVENT_TYPE,
        }
    }
}

/// Validated slash-command request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPayload {
    /// HTTPS `response_url` the final reply is POSTed to.
    pub reply_target: String,
    /// User who issued the command.
    pub requester_id: SlackUserId,
    /// Content page to expand.
    pub content_url: String,
    /// Zero-based part selector.
    pub selected_index: usize,
}

/// A `link_shared` notification awaiting unfurl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEventPayload {
    /// Request token of the originating tenant; resolves the outbound
    /// credential at processing time.
    pub tenant_token: String,
    /// Slack-assigned event identifier.
    pub event_id: String,
    /// Epoch seconds when Slack dispatched the event.
    pub event_time: i64,
    /// Channel of the message carrying the links.
    pub channel: SlackChannelId,
    /// User who shared the links.
    pub user: SlackUserId,
    /// Timestamp of the message carrying the links.
    pub message_ts: SlackTs,
    /// Parent thread timestamp, if any.
    pub thread_ts: Option<SlackTs>,
    /// Links in message order.
    pub links: Vec<SharedLink>,
}

impl LinkEventPayload {
    /// Build a payload from a verified `link_shared` callback.
    #[must_use]
    pub fn from_callback(callback: &EventCallback) -> Self {
        Self {
            tenant_token: callback.token.clone(),
            event_id: callback.event_id.clone(),
            event_time: callback.event_time,
            channel: callback.event.channel.clone(),
            user: callback.event.user.clone(),
            message_ts: callback.event.message_ts.clone(),
            thread_ts: callback.event.thread_ts.clone(),
            links: callback.event.links.clone(),
        }
    }

    /// Rebuild the callback envelope carried on the wire.
    #[must_use]
    pub fn to_callback(&self) -> EventCallback {
        EventCallback {
            token: self.tenant_token.clone(),
            kind: EVENT_CALLBACK.to_owned(),
            event_id: self.event_id.clone(),
            event_time: self.event_time,
            event: LinkSharedEvent {
                kind: LINK_SHARED.to_owned(),
                channel: self.channel.clone(),
                user: self.user.clone(),
                message_ts: self.message_ts.clone(),
                thread_ts: self.thread_ts.clone(),
                links: self.links.clone(),
            },
        }
    }
}

/// Payload of a work item; exactly one variant, matching its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkPayload {
    /// Slash-command work.
    Command(CommandPayload),
    /// Link-unfurl work.
    LinkEvent(LinkEventPayload),
}

/// Immutable unit of queued work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Creation time, second precision.
    pub created_at: DateTime<Utc>,
    /// Work to perform.
    pub payload: WorkPayload,
}

impl WorkItem {
    /// Create a work item stamped with the current time.
    #[must_use]
    pub fn new(payload: WorkPayload) -> Self {
        Self::at(Utc::now(), payload)
    }

    /// Create a work item with an explicit creation time, truncated to whole
    /// seconds to match the wire precision.
    #[must_use]
    pub fn at(created_at: DateTime<Utc>, payload: WorkPayload) -> Self {
        let created_at = Utc
            .timestamp_opt(created_at.timestamp(), 0)
            .single()
            .unwrap_or(created_at);
        Self {
            created_at,
            payload,
        }
    }

    /// Kind of this item, derived from its payload.
    #[must_use]
    pub fn kind(&self) -> WorkKind {
        match self.payload {
            WorkPayload::Command(_) => WorkKind::Command,
            WorkPayload::LinkEvent(_) => WorkKind::LinkEvent,
        }
    }

    /// Age of the item relative to `now`; negative ages clamp to zero.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }

    /// Serialize into a queue message body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Queue` if JSON serialization fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(&QueueMessage::from(self))
            .map_err(|err| AppError::Queue(format!("failed to encode work item: {err}")))
    }

    /// Decode a queue message body.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Decode` when the body is not valid JSON, names an
    /// unknown type, or lacks the payload its type requires.
    pub fn decode(body: &str) -> Result<Self> {
        let message: QueueMessage = serde_json::from_str(body)
            .map_err(|err| AppError::Decode(format!("invalid queue message: {err}")))?;
        Self::try_from(message)
    }
}

/// Slash-command section of the wire message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlashMessage {
    /// Content page to expand.
    pub instagram_url: String,
    /// Slack `response_url`.
    pub response_url: String,
    /// Requesting user.
    pub user_id: SlackUserId,
    /// Zero-based part selector.
    #[serde(default)]
    pub selected_index: usize,
}

/// JSON body of a queue message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueMessage {
    /// Creation time in epoch seconds.
    pub request_timestamp: i64,
    /// Work discriminator (`slash_command` or `unfurl_event`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Present for `slash_command` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slash_message: Option<SlashMessage>,
    /// Present for `unfurl_event` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfurl_message: Option<EventCallback>,
}

impl From<&WorkItem> for QueueMessage {
    fn from(item: &WorkItem) -> Self {
        let (slash_message, unfurl_message) = match &item.payload {
            WorkPayload::Command(cmd) => (
                Some(SlashMessage {
                    instagram_url: cmd.content_url.clone(),
                    response_url: cmd.reply_target.clone(),
                    user_id: cmd.requester_id.clone(),
                    selected_index: cmd.selected_index,
                }),
                None,
            ),
            WorkPayload::LinkEvent(evt) => (None, Some(evt.to_callback())),
        };

        Self {
            request_timestamp: item.created_at.timestamp(),
            kind: item.kind().as_str().to_owned(),
            slash_message,
            unfurl_message,
        }
    }
}

impl TryFrom<QueueMessage> for WorkItem {
    type Error = AppError;

    fn try_from(message: QueueMessage) -> Result<Self> {
        let created_at = Utc
            .timestamp_opt(message.request_timestamp, 0)
            .single()
            .ok_or_else(|| {
                AppError::Decode(format!(
                    "request_timestamp out of range: {}",
                    message.request_timestamp
                ))
            })?;

        let payload = match (
            message.kind.as_str(),
            message.slash_message,
            message.unfurl_message,
        ) {
            (SLASH_COMMAND_TYPE, Some(slash), None) => WorkPayload::Command(CommandPayload {
                reply_target: slash.response_url,
                requester_id: slash.user_id,
                content_url: slash.instagram_url,
                selected_index: slash.selected_index,
            }),
            (UNFURL_EVENT_TYPE, None, Some(callback)) => {
                WorkPayload::LinkEvent(LinkEventPayload::from_callback(&callback))
            }
            (SLASH_COMMAND_TYPE | UNFURL_EVENT_TYPE, _, _) => {
                return Err(AppError::Decode(format!(
                    "payload does not match message type {}",
                    message.kind
                )));
            }
            (other, _, _) => {
                return Err(AppError::Decode(format!("unknown message type {other}")));
            }
        };

        Ok(Self {
            created_at,
            payload,
        })
    }
}
