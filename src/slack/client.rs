//! Outbound Slack delivery: `response_url` replies and `chat.unfurl`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use slack_morphism::prelude::{
    SlackApiChatUnfurlRequestV3, SlackApiToken, SlackApiTokenType, SlackApiTokenValue,
    SlackClient, SlackClientHttpConnector, SlackClientHyperHttpsConnector, SlackUnfurlRequestId,
};
use tracing::info;

use crate::slack::blocks::ReplyMessage;
use crate::{AppError, Result};

/// Capability to post messages back to Slack.
pub trait ReplySink: Send + Sync {
    /// POST a slash-command reply to its `response_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Delivery` if the request fails or Slack rejects it.
    fn post_reply<'a>(
        &'a self,
        response_url: &'a str,
        message: &'a ReplyMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Call `chat.unfurl` with the tenant's OAuth token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Delivery` if the request fails or Slack rejects it.
    fn post_unfurl<'a>(
        &'a self,
        oauth_token: &'a str,
        request: &'a SlackApiChatUnfurlRequestV3,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// [`ReplySink`] posting replies over the shared HTTP client and unfurls
/// through a Slack Web API session.
pub struct SlackPoster<C = SlackClientHyperHttpsConnector>
where
    C: SlackClientHttpConnector + Send + Sync,
{
    http: reqwest::Client,
    slack: Arc<SlackClient<C>>,
}

impl SlackPoster {
    /// Create a poster whose Web API calls go to `slack_api_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTPS connector cannot be created.
    pub fn new(http: reqwest::Client, slack_api_url: &str) -> Result<Self> {
        let connector = SlackClientHyperHttpsConnector::new()
            .map_err(|err| AppError::Config(format!("failed to init slack connector: {err}")))?
            .with_slack_api_url(slack_api_url);
        Ok(Self::with_connector(http, connector))
    }
}

impl<C> SlackPoster<C>
where
    C: SlackClientHttpConnector + Send + Sync,
{
    /// Create a poster over an already configured Slack connector.
    #[must_use]
    pub fn with_connector(http: reqwest::Client, connector: C) -> Self {
        Self {
            http,
            slack: Arc::new(SlackClient::new(connector)),
        }
    }
}

fn bot_token(oauth_token: &str) -> SlackApiToken {
    SlackApiToken {
        token_value: SlackApiTokenValue(oauth_token.to_owned()),
        cookie: None,
        team_id: None,
        scope: None,
        token_type: Some(SlackApiTokenType::Bot),
    }
}

impl<C> ReplySink for SlackPoster<C>
where
    C: SlackClientHttpConnector + Send + Sync,
{
    fn post_reply<'a>(
        &'a self,
        response_url: &'a str,
        message: &'a ReplyMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            info!(response_url, text = %message.text, "sending slash command response");
            let response = self
                .http
                .post(response_url)
                .json(message)
                .send()
                .await
                .map_err(|err| AppError::Delivery(format!("failed to post reply: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::Delivery(format!(
                    "reply rejected with status {status}"
                )));
            }
            Ok(())
        })
    }

    fn post_unfurl<'a>(
        &'a self,
        oauth_token: &'a str,
        request: &'a SlackApiChatUnfurlRequestV3,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let SlackUnfurlRequestId::ChannelTs(ref target) = request.id {
                info!(
                    channel = %target.channel,
                    ts = %target.ts,
                    links = request.unfurls.len(),
                    "sending unfurl request"
                );
            }

            let token = bot_token(oauth_token);
            let session = self.slack.open_session(&token);
            session
                .chat_unfurl_v3(request)
                .await
                .map_err(|err| AppError::Delivery(format!("chat.unfurl failed: {err}")))?;
            Ok(())
        })
    }
}
