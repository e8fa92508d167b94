//! Slash command handling.
//!
//! The synchronous half validates the command and queues it, answering
//! with an ephemeral "Fetching ..." acknowledgement. The queue half fetches
//! the post and replies publicly through the command's `response_url`.

use std::collections::HashSet;

use slack_morphism::prelude::SlackUserId;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::models::work_item::{CommandPayload, WorkItem, WorkPayload};
use crate::slack::blocks::{self, ReplyMessage, ENQUEUE_FAILED_TEXT, FETCH_FAILED_TEXT};
use crate::state::AppState;
use crate::{AppError, Result};

/// Fields of a slash-command form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandForm {
    /// Tenant verification token.
    pub token: String,
    /// Command name, e.g. `/insta`.
    pub command: String,
    /// Everything typed after the command.
    pub text: String,
    /// URL accepting delayed replies.
    pub response_url: String,
    /// Invoking user.
    pub user_id: String,
}

impl CommandForm {
    /// Parse an `application/x-www-form-urlencoded` body. The first
    /// occurrence of a repeated key wins; missing keys are empty.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut form = Self::default();
        let mut seen = HashSet::new();
        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            if !seen.insert(key.clone()) {
                continue;
            }
            let slot = match &*key {
                "token" => &mut form.token,
                "command" => &mut form.command,
                "text" => &mut form.text,
                "response_url" => &mut form.response_url,
                "user_id" => &mut form.user_id,
                _ => continue,
            };
            *slot = value.into_owned();
        }
        form
    }
}

/// Validate a command submission and build its payload.
///
/// Checks run in order and the first failure wins: HTTPS `response_url`,
/// content URL prefix, one or two tokens, numeric part selector. The
/// selector is 1-based; values below one select the first part.
///
/// # Errors
///
/// Returns `AppError::Validation` carrying the user-visible reply text.
pub fn parse_command(form: &CommandForm, config: &GlobalConfig) -> Result<CommandPayload> {
    let text = form.text.trim();

    if !form.response_url.starts_with("https://") {
        warn!(response_url = %form.response_url, "bad response_url");
        return Err(AppError::Validation("bad request (response_url)".into()));
    }

    let usage = || AppError::Validation(blocks::usage_text(&config.slash_command));

    if !text.starts_with(&config.content_url_prefix) {
        return Err(usage());
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let (content_url, selector) = match tokens.as_slice() {
        [url] => (*url, None),
        [url, selector] => (*url, Some(*selector)),
        _ => return Err(usage()),
    };

    let selected_index = match selector {
        None => 0,
        Some(raw) => {
            let n: i64 = raw.parse().map_err(|_| usage())?;
            usize::try_from(n.saturating_sub(1)).unwrap_or(0)
        }
    };

    Ok(CommandPayload {
        reply_target: form.response_url.clone(),
        requester_id: SlackUserId(form.user_id.clone()),
        content_url: content_url.to_owned(),
        selected_index,
    })
}

/// Validate and enqueue a slash command, returning the immediate reply.
pub async fn handle_command(form: &CommandForm, state: &AppState) -> ReplyMessage {
    info!(text = %form.text, user_id = %form.user_id, "received slash command");

    let payload = match parse_command(form, &state.config) {
        Ok(payload) => payload,
        Err(AppError::Validation(text)) => return blocks::ephemeral(text),
        Err(err) => return blocks::ephemeral(err.to_string()),
    };

    let content_url = payload.content_url.clone();
    let item = WorkItem::new(WorkPayload::Command(payload));
    if let Err(err) = enqueue(&item, state).await {
        warn!(%err, "error enqueueing slash command");
        return blocks::ephemeral(ENQUEUE_FAILED_TEXT);
    }

    blocks::ephemeral(format!("Fetching {content_url} ..."))
}

/// Queue-side processing: fetch the post and post the reply.
///
/// Fetch failures produce an ephemeral notice; delivery failures are
/// logged and swallowed.
pub async fn process_command(payload: &CommandPayload, state: &AppState) {
    let index = i64::try_from(payload.selected_index).unwrap_or(i64::MAX);

    let reply = match state.source.fetch(&payload.content_url, index).await {
        Ok(meta) => {
            info!(
                url = %payload.content_url,
                title = %meta.title,
                parts = meta.part_count,
                "fetched post for slash command"
            );
            blocks::command_reply(&payload.requester_id, &meta)
        }
        Err(err) => {
            warn!(%err, url = %payload.content_url, "error fetching post for slash command");
            blocks::ephemeral(FETCH_FAILED_TEXT)
        }
    };

    if let Err(err) = state.sink.post_reply(&payload.reply_target, &reply).await {
        warn!(%err, "failed to deliver slash command response");
    }
}

pub(crate) async fn enqueue(item: &WorkItem, state: &AppState) -> Result<()> {
    let body = item.encode()?;
    info!(
        kind = item.kind().as_str(),
        queue = state.queue.queue_url(),
        "enqueueing work item"
    );
    state.queue.send(body).await
}
