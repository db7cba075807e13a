use thiserror::Error;

/// Fatal import failures. Every variant means the page could not be
/// obtained, so no extraction was attempted.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timed out after {timeout_secs}s fetching {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid import URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl ImportError {
    /// Maps a `reqwest` failure for `url`, separating client-side timeouts
    /// from other transport errors.
    pub(crate) fn from_reqwest(url: &str, timeout_secs: u64, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ImportError::Timeout {
                url: url.to_owned(),
                timeout_secs,
            }
        } else {
            ImportError::Http {
                url: url.to_owned(),
                source,
            }
        }
    }
}

/// Failures of the optional AI-assisted extraction. These never abort an
/// import: the run falls back to heuristic fields and records the error in
/// its trace.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    #[error("completion service returned HTTP {status}")]
    Status { status: u16 },

    #[error("completion timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("completion response is not a usable JSON object: {0}")]
    Parse(String),
}
