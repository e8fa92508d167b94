//! `link_shared` event handling.
//!
//! Events are queued immediately with no synchronous work. On the queue
//! side every link is fetched in order and the previews are posted in a
//! single `chat.unfurl` call.
//!
//! A fetch failure on any link abandons the whole event, including
//! previews already resolved for earlier links.

use std::collections::HashMap;

use slack_morphism::prelude::{SlackApiChatUnfurlRequestV3, SlackChannelTs, SlackUnfurlRequestId};
use tracing::{info, warn};

use crate::models::slack_event::{EventCallback, LINK_SHARED};
use crate::models::work_item::{LinkEventPayload, WorkItem, WorkPayload};
use crate::slack::blocks;
use crate::slack::commands::enqueue;
use crate::state::AppState;
use crate::{AppError, Result};

/// Queue a verified event callback for unfurling.
///
/// # Errors
///
/// Returns `AppError::UnsupportedEventType` for anything but
/// `link_shared`, and `AppError::Queue` if the enqueue fails.
pub async fn handle_event(callback: &EventCallback, state: &AppState) -> Result<()> {
    if callback.event.kind != LINK_SHARED {
        warn!(event_type = %callback.event.kind, "event isn't link_shared");
        return Err(AppError::UnsupportedEventType(callback.event.kind.clone()));
    }

    info!(
        event_id = %callback.event_id,
        channel = %callback.event.channel,
        links = callback.event.links.len(),
        "received link_shared event"
    );

    let item = WorkItem::new(WorkPayload::LinkEvent(LinkEventPayload::from_callback(
        callback,
    )));
    enqueue(&item, state).await.map_err(|err| {
        warn!(%err, "error enqueueing link_shared event");
        err
    })
}

/// Queue-side processing: build previews and post them.
pub async fn process_event(payload: &LinkEventPayload, state: &AppState) {
    let mut unfurls = HashMap::new();

    for link in &payload.links {
        match state.source.fetch(&link.url, 0).await {
            Ok(meta) => {
                info!(url = %link.url, title = %meta.title, "fetched post for unfurl");
                unfurls.insert(link.url.clone(), blocks::unfurl(&meta));
            }
            Err(err) => {
                warn!(
                    %err,
                    url = %link.url,
                    resolved = unfurls.len(),
                    "error fetching post; abandoning unfurl for the whole event"
                );
                return;
            }
        }
    }

    let Some(team) = state.config.team_by_request_token(&payload.tenant_token) else {
        info!(event_id = %payload.event_id, "no tenant for event token; dropping unfurl");
        return;
    };

    let request = SlackApiChatUnfurlRequestV3::new(
        SlackUnfurlRequestId::ChannelTs(SlackChannelTs::new(
            payload.channel.clone(),
            payload.message_ts.clone(),
        )),
        unfurls,
    );

    if let Err(err) = state.sink.post_unfurl(&team.oauth_token, &request).await {
        warn!(%err, team = %team.name, "failed to deliver unfurl");
    }
}
