//! Source adapter error types.

/// Longest response excerpt kept on a parse failure.
const BODY_EXCERPT_CHARS: usize = 500;

/// Errors from the upstream data sources.
///
/// None of these reach callers of the pipeline: a failing source is
/// logged and the next one in the chain is tried.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection failure, timeout, or an interrupted body.
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status.
    #[error("source unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// Upstream signalled a rate limit or exhausted quota.
    #[error("rate limited by upstream")]
    RateLimited,

    /// The payload did not have the expected shape.
    #[error("malformed response: {message}")]
    Malformed {
        message: String,
        body: Option<String>,
    },

    /// The adapter is missing a key or URL, or was given an invalid one.
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl SourceError {
    /// Build a `Malformed` error keeping a short excerpt of the body.
    pub fn malformed(message: impl Into<String>, body: &str) -> Self {
        SourceError::Malformed {
            message: message.into(),
            body: Some(body.chars().take(BODY_EXCERPT_CHARS).collect()),
        }
    }

    /// Connection-level failure, as opposed to an answer we did not like.
    pub fn is_network(&self) -> bool {
        matches!(self, SourceError::Network(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited)
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_network() || self.is_rate_limited()
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return SourceError::Unavailable {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return SourceError::Malformed {
                message: err.to_string(),
                body: None,
            };
        }
        if err.is_builder() {
            return SourceError::NotConfigured(err.to_string());
        }
        SourceError::Network(err.to_string())
    }
}

/// Whether a response body talks about rate limits or quotas.
pub fn mentions_rate_limit(body: &str) -> bool {
    let body = body.to_lowercase();
    ["rate limit", "rate-limit", "ratelimit", "quota", "too many requests"]
        .iter()
        .any(|phrase| body.contains(phrase))
}
