use std::{sync::Arc, time::Duration};

/// Boxed error returned by a [`Transport`](crate::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared transport error, kept behind an `Arc` so results stay cloneable.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Error type returned by this crate.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RestError {
    /// Request could not be configured (bad base URL, body serialization).
    ///
    /// Recorded by the builder and reported when the request executes.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// Non-retryable network failure, or a retryable one on a non-GET request.
    #[error("transport error: {0}")]
    Transport(#[source] SharedError),
    /// The per-attempt timeout elapsed before the response was read.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,
    /// Every allowed attempt failed with a retryable error.
    #[error("unexpected error: {attempts} attempts failed, last: {last}")]
    ExhaustedRetries {
        /// Number of network attempts made.
        attempts: usize,
        /// Cause of the final attempt's failure.
        #[source]
        last: SharedError,
    },
    /// Non-success HTTP status with raw response body.
    ///
    /// Only produced by [`RestResult::ensure_success`](crate::RestResult::ensure_success).
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body is not valid JSON for the requested type.
    #[error("http response body decode error: {source}, raw data: {body}")]
    Decode {
        #[source]
        source: Arc<serde_json::Error>,
        body: String,
    },
    /// Decoding was requested but the response body was empty.
    #[error("http response body is empty")]
    EmptyBody,
}

/// Deferred request configuration error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base url '{0}' cannot carry a sub-path")]
    CannotBeABase(String),
    #[error("request body serialization failed: {0}")]
    SerializeBody(#[source] Arc<serde_json::Error>),
    #[error("sub-path template '{template}': {reason}")]
    SubPathTemplate { template: String, reason: String },
    #[error("basic auth credentials do not form a valid header value")]
    InvalidCredentials(#[source] Arc<reqwest::header::InvalidHeaderValue>),
}
