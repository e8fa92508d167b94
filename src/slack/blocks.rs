//! Slack message builders for slash-command replies and link unfurls.

use serde::{Deserialize, Serialize};
use slack_morphism::prelude::{
    SlackApiChatUnfurlMapItemV2, SlackBlock, SlackBlockImageElement, SlackBlockText,
    SlackImageUrlOrFile, SlackMessageResponseType, SlackSectionBlock, SlackSectionBlockElement,
    SlackUserId,
};
use url::Url;

use crate::models::metadata::MetadataRecord;

/// Reply posted to the failing `response_url` when content cannot be fetched.
pub const FETCH_FAILED_TEXT: &str = "Error fetching data from instagram";

/// Reply returned when the command could not be queued.
pub const ENQUEUE_FAILED_TEXT: &str = "Failed to enqueue request";

/// Slash-command response body (`response_url` and synchronous replies).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyMessage {
    /// Visibility of the reply.
    pub response_type: SlackMessageResponseType,
    /// Message text.
    pub text: String,
    /// Legacy attachments; omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Legacy message attachment carrying the post preview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Post title.
    pub title: String,
    /// Link behind the title.
    pub title_link: String,
    /// Image shown in the attachment.
    pub image_url: String,
    /// Post owner, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Post owner's avatar, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_icon: Option<String>,
}

/// Build an ephemeral (requester-only) reply.
#[must_use]
pub fn ephemeral(text: impl Into<String>) -> ReplyMessage {
    ReplyMessage {
        response_type: SlackMessageResponseType::Ephemeral,
        text: text.into(),
        attachments: Vec::new(),
    }
}

/// Usage hint for the slash command.
#[must_use]
pub fn usage_text(slash_command: &str) -> String {
    format!("Usage: `{slash_command} <instagram-url> [photo-number](optional)`")
}

/// Build the public reply announcing a shared post.
#[must_use]
pub fn command_reply(requester: &SlackUserId, meta: &MetadataRecord) -> ReplyMessage {
    let mut text = format!("<@{requester}> shared this instagram post");

    let mut extra = Vec::new();
    if meta.is_video {
        extra.push("video".to_owned());
    }
    if meta.is_multi_part() {
        extra.push(format!("{} parts", meta.part_count));
    }
    if !extra.is_empty() {
        text = format!("{text} ({})", extra.join(", "));
    }

    ReplyMessage {
        response_type: SlackMessageResponseType::InChannel,
        text,
        attachments: vec![Attachment {
            title: meta.title.clone(),
            title_link: meta.canonical_url.clone(),
            image_url: meta.image_url.clone(),
            author_name: meta.owner_username.clone(),
            author_icon: meta.owner_avatar_url.clone(),
        }],
    }
}

/// Build the preview for one unfurled link.
///
/// The text links the canonical URL with Slack `mrkdwn` syntax. The image
/// accessory is left out when the image URL does not parse.
#[must_use]
pub fn unfurl(meta: &MetadataRecord) -> SlackApiChatUnfurlMapItemV2 {
    let mut section = SlackSectionBlock::new().with_text(SlackBlockText::MarkDown(
        format!("{} - <{}|link>", meta.title, meta.canonical_url).into(),
    ));

    if let Ok(image_url) = Url::parse(&meta.image_url) {
        let alt_text = if meta.title.is_empty() {
            "instagram post".to_owned()
        } else {
            meta.title.clone()
        };
        section = section.with_accessory(SlackSectionBlockElement::Image(
            SlackBlockImageElement::new(SlackImageUrlOrFile::ImageUrl { image_url }, alt_text),
        ));
    }

    SlackApiChatUnfurlMapItemV2::new(vec![SlackBlock::Section(section)])
}
