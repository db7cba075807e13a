//! Page fetching: the [`PageFetcher`] contract and its `reqwest` implementation.

mod origin;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ImportError;
use crate::retry::retry_with_backoff;

pub use origin::{absolutize_url, page_host};
pub(crate) use origin::validate_import_url;

/// Sent on a second attempt when a site answers the regular user agent with
/// HTTP 403.
pub(crate) const BROWSER_FALLBACK_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A fetched external page. Owned by one import run and dropped after
/// extraction.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
    pub status: u16,
    pub content_type: Option<String>,
}

/// Retrieves a page's HTML. Implementations must report any non-success
/// status, connection failure or timeout as an [`ImportError`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ImportError>;
}

/// [`PageFetcher`] backed by `reqwest`, with a per-request timeout, a
/// browser-profile retry on HTTP 403 and backoff retries for transient errors.
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    timeout_secs: u64,
    /// Retry attempts after the first failure for retriable errors.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ClientBuild`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .build()
            .map_err(ImportError::ClientBuild)?;
        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
            timeout_secs,
            max_retries,
            backoff_base_secs,
        })
    }

    async fn fetch_once(&self, url: &str, user_agent: &str) -> Result<FetchedPage, ImportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| ImportError::from_reqwest(url, self.timeout_secs, e))?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ImportError::RateLimited {
                domain: page_host(url).unwrap_or_else(|| url.to_owned()),
                retry_after_secs,
            });
        }

        if !status.is_success() {
            return Err(ImportError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let html = response
            .text()
            .await
            .map_err(|e| ImportError::from_reqwest(url, self.timeout_secs, e))?;

        Ok(FetchedPage {
            url: final_url,
            html,
            status: status.as_u16(),
            content_type,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ImportError> {
        let parsed = validate_import_url(url).map_err(|reason| ImportError::InvalidUrl {
            url: url.to_owned(),
            reason,
        })?;
        let url = parsed.as_str();

        let first = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.fetch_once(url, &self.user_agent)
        })
        .await;

        match first {
            Err(ImportError::UnexpectedStatus { status: 403, .. })
                if self.user_agent != BROWSER_FALLBACK_UA =>
            {
                tracing::info!(url, "HTTP 403 with default user agent, retrying with browser profile");
                self.fetch_once(url, BROWSER_FALLBACK_UA).await
            }
            other => other,
        }
    }
}
