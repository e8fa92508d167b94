//! Inbound Slack Events API payloads.
//!
//! Fields Slack may omit are defaulted; the `type` discriminator then
//! decides whether a decoded object has the expected shape.

use serde::{Deserialize, Serialize};
use slack_morphism::prelude::{SlackChannelId, SlackTs, SlackUserId};

/// Envelope type of a URL verification handshake.
pub const URL_VERIFICATION: &str = "url_verification";

/// Envelope type of an event notification.
pub const EVENT_CALLBACK: &str = "event_callback";

/// The only event sub-type the bridge handles.
pub const LINK_SHARED: &str = "link_shared";

/// `url_verification` handshake sent when the events endpoint is registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// Tenant verification token.
    #[serde(default)]
    pub token: String,
    /// Value to echo back verbatim.
    #[serde(default)]
    pub challenge: String,
    /// Envelope discriminator.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl ChallengeRequest {
    /// Interpret `body` as a handshake; `None` when it is some other shape.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|req| req.kind == URL_VERIFICATION)
    }
}

/// A link attached to a `link_shared` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedLink {
    /// Registered unfurl domain the link matched.
    #[serde(default)]
    pub domain: String,
    /// Full link as posted.
    #[serde(default)]
    pub url: String,
}

/// Inner event of an `event_callback` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkSharedEvent {
    /// Event sub-type.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Channel the message was posted in.
    #[serde(default = "empty_channel")]
    pub channel: SlackChannelId,
    /// User who shared the links.
    #[serde(default = "empty_user")]
    pub user: SlackUserId,
    /// Timestamp of the message carrying the links.
    #[serde(rename = "message_ts", default = "empty_ts")]
    pub message_ts: SlackTs,
    /// Parent thread timestamp when the message was a thread reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<SlackTs>,
    /// Links in message order.
    #[serde(default)]
    pub links: Vec<SharedLink>,
}

fn empty_channel() -> SlackChannelId {
    SlackChannelId(String::new())
}

fn empty_user() -> SlackUserId {
    SlackUserId(String::new())
}

fn empty_ts() -> SlackTs {
    SlackTs(String::new())
}

/// `event_callback` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventCallback {
    /// Tenant verification token.
    #[serde(default)]
    pub token: String,
    /// Envelope discriminator.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Unique event identifier assigned by Slack.
    #[serde(default)]
    pub event_id: String,
    /// Epoch seconds when the event was dispatched.
    #[serde(default)]
    pub event_time: i64,
    /// The wrapped event.
    pub event: LinkSharedEvent,
}

impl EventCallback {
    /// Interpret `body` as an event notification; `None` when it is some
    /// other shape.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|evt| evt.kind == EVENT_CALLBACK)
    }
}
