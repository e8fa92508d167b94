//! Outbound content fetch feeding the extractor.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{COOKIE, USER_AGENT};
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::extract::Extractor;
use crate::models::metadata::MetadataRecord;
use crate::{AppError, Result};

/// Value sent in the `x-requested-with` header.
const REQUESTED_WITH: &str = concat!("insta-unfurl/", env!("CARGO_PKG_VERSION"));

/// Capability to turn a content URL into a [`MetadataRecord`].
pub trait MetadataSource: Send + Sync {
    /// Fetch `url` and extract metadata for the part at `selected_index`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Fetch` on network failure or an error status and
    /// `AppError::NoMetadataFound` when extraction is exhausted.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        selected_index: i64,
    ) -> Pin<Box<dyn Future<Output = Result<MetadataRecord>> + Send + 'a>>;
}

/// Build the HTTP client shared by every outbound call.
///
/// # Errors
///
/// Returns `AppError::Config` if the TLS backend cannot be initialised.
pub fn build_http_client(config: &GlobalConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.external_timeout())
        .build()
        .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))
}

/// [`MetadataSource`] backed by a real HTTP GET.
pub struct HttpFetcher {
    client: reqwest::Client,
    extractor: Extractor,
    user_agent: String,
    cookies: String,
}

impl HttpFetcher {
    /// Create a fetcher using the shared client and configured credentials.
    #[must_use]
    pub fn new(client: reqwest::Client, extractor: Extractor, config: &GlobalConfig) -> Self {
        Self {
            client,
            extractor,
            user_agent: config.user_agent.clone(),
            cookies: config.cookies.clone(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header("x-requested-with", REQUESTED_WITH);
        if !self.cookies.is_empty() {
            request = request.header(COOKIE, &self.cookies);
        }

        info!(url, "fetching content page");
        let response = request
            .send()
            .await
            .map_err(|err| AppError::Fetch(format!("request for {url} failed: {err}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!(url, status = status.as_u16(), "content page returned error status");
            return Err(AppError::Fetch(format!("unexpected status {status} for {url}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| AppError::Fetch(format!("failed to read body of {url}: {err}")))?;
        info!(url, bytes = body.len(), "content page fetched, parsing metadata");
        Ok(body.to_vec())
    }
}

impl MetadataSource for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        selected_index: i64,
    ) -> Pin<Box<dyn Future<Output = Result<MetadataRecord>> + Send + 'a>> {
        Box::pin(async move {
            let document = self.fetch_page(url).await?;
            self.extractor.extract(&document, url, selected_index)
        })
    }
}
