//! Global configuration parsing, validation, and tenant credential lookup.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name used for the content-provider cookie.
const KEYRING_SERVICE: &str = "insta-unfurl";

/// One configured Slack workspace (tenant).
///
/// Keyed in [`GlobalConfig::slack_teams`] by the request-time verification
/// token Slack attaches to every inbound payload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TeamInfo {
    /// Human-readable workspace name, used in logs only.
    pub name: String,
    /// Bot OAuth token used for outbound `chat.unfurl` calls.
    pub oauth_token: String,
}

fn default_http_port() -> u16 {
    3000
}

fn default_external_timeout_seconds() -> u64 {
    20
}

fn default_max_lag_seconds() -> u64 {
    30
}

fn default_slash_command() -> String {
    "/insta".into()
}

fn default_content_url_prefix() -> String {
    "https://www.instagram.com/p/".into()
}

fn default_slack_api_url() -> String {
    "https://slack.com/api".into()
}

fn default_user_agent() -> String {
    format!("insta-unfurl/{}", env!("CARGO_PKG_VERSION"))
}

/// Global configuration parsed from `config.toml` (or `CONFIG_JSON`).
///
/// Loaded once at startup and shared read-only for the lifetime of the
/// process.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Identity of the work queue messages are sent to and deleted from.
    pub queue_url: String,
    /// Tenant registry keyed by request token.
    pub slack_teams: HashMap<String, TeamInfo>,
    /// Cookie header sent with every content fetch.
    #[serde(default)]
    pub cookies: String,
    /// HTTP port for the inbound transport.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Timeout applied to every outbound request.
    #[serde(default = "default_external_timeout_seconds")]
    pub external_timeout_seconds: u64,
    /// Maximum age of a queued work item before it is dropped unprocessed.
    #[serde(default = "default_max_lag_seconds")]
    pub max_lag_seconds: u64,
    /// Slash command name this bridge answers to.
    #[serde(default = "default_slash_command")]
    pub slash_command: String,
    /// Required prefix of every content URL.
    #[serde(default = "default_content_url_prefix")]
    pub content_url_prefix: String,
    /// Base URL of the Slack Web API; `chat.unfurl` is posted beneath it.
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON document, the format accepted in the
    /// `CONFIG_JSON` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|err| AppError::Config(format!("invalid config json: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Fill in the content-provider cookie from the OS keychain or the
    /// `INSTA_COOKIES` environment variable when the config leaves it empty.
    ///
    /// A missing cookie is not fatal; fetches then go out anonymously.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain lookup task panics.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if !self.cookies.is_empty() {
            return Ok(());
        }
        match load_credential("cookies", "INSTA_COOKIES").await? {
            Some(cookies) => self.cookies = cookies,
            None => warn!("no content cookie configured; fetching anonymously"),
        }
        Ok(())
    }

    /// Timeout shared by all outbound network operations.
    #[must_use]
    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_seconds)
    }

    /// Staleness threshold for queued work items.
    #[must_use]
    pub fn max_lag(&self) -> Duration {
        Duration::from_secs(self.max_lag_seconds)
    }

    /// Look up a tenant by its request token without judging the result.
    #[must_use]
    pub fn team_by_request_token(&self, token: &str) -> Option<&TeamInfo> {
        self.slack_teams.get(token)
    }

    /// Tenant gate shared by every inbound entry path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming the offending token when no
    /// tenant is registered for it.
    pub fn authorize_tenant(&self, token: &str) -> Result<&TeamInfo> {
        self.team_by_request_token(token).ok_or_else(|| {
            warn!(token, "rejected request with unknown tenant token");
            AppError::Validation(format!("Bad slack api request token ({token})"))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.queue_url.trim().is_empty() {
            return Err(AppError::Config("queue_url must not be empty".into()));
        }

        if self.slack_teams.is_empty() {
            return Err(AppError::Config("slack_teams must not be empty".into()));
        }

        if self.external_timeout_seconds == 0 {
            return Err(AppError::Config(
                "external_timeout_seconds must be greater than zero".into(),
            ));
        }

        if !self.content_url_prefix.starts_with("https://") {
            return Err(AppError::Config(
                "content_url_prefix must be an https url".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    Ok(env::var(env_key).ok().filter(|value| !value.is_empty()))
}
