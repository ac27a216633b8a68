use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use reqwest::{header::HeaderMap, Method};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    attempt::{self, Attempt, Credentials},
    compose::{self, QueryParams},
    error::ConfigError,
    transport::Transport,
    RestError, RestResult,
};

/// Fluent builder for a single REST call.
///
/// Setters never fail. Problems found while configuring (a body that does
/// not serialize, a bad base URL) are kept and reported by
/// [`Request::execute`] without touching the network.
pub struct Request<T> {
    transport: T,
    method: Method,
    base_url: String,
    sub_path: String,
    sub_path_args: Vec<String>,
    params: QueryParams,
    headers: Option<HeaderMap>,
    body: Bytes,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
    max_retries: usize,
    retry_interval: Duration,
    credentials: Credentials,
    err: Option<RestError>,
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("sub_path", &self.sub_path)
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("credentials", &self.credentials)
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Request<T> {
    pub(crate) fn new(
        transport: T,
        method: Method,
        base_url: String,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            method,
            base_url,
            sub_path: String::new(),
            sub_path_args: Vec::new(),
            params: QueryParams::new(),
            headers: None,
            body: Bytes::new(),
            cancel: None,
            timeout: None,
            max_retries: 0,
            retry_interval: Duration::ZERO,
            credentials,
            err: None,
        }
    }

    /// Adds a query parameter. Existing values for `name` are kept.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Adds several query parameters, appending to existing values.
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in params {
            self = self.with_param(name, value);
        }
        self
    }

    /// Merges headers into the request.
    ///
    /// The first call adopts `headers` as is; later calls append each value
    /// to the existing entries. `Content-Type`, `Accept` and
    /// `Accept-Charset` are always overridden and `Accept-Encoding` is
    /// always dropped when the request is sent.
    pub fn with_header(mut self, headers: HeaderMap) -> Self {
        match self.headers.as_mut() {
            None => self.headers = Some(headers),
            Some(existing) => {
                for (name, value) in headers.iter() {
                    existing.append(name.clone(), value.clone());
                }
            }
        }
        self
    }

    /// Aborts in-flight attempts and retry waits when `token` is cancelled.
    pub fn with_context(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bounds every attempt by `timeout` and sends it as the `timeout`
    /// query parameter. A zero duration disables both.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Maximum number of retries after the first attempt.
    pub fn with_max_retry(mut self, count: usize) -> Self {
        self.max_retries = count;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Sets the sub-path appended to the base URL.
    pub fn sub_resource(self, sub_path: &str) -> Self {
        self.sub_resourcef(sub_path, &[])
    }

    /// Sets a sub-path template rendered positionally with `args`.
    ///
    /// Each `%` verb (`%d`, `%s`, `%v`, ...) takes the next argument;
    /// `%%` is a literal percent sign.
    ///
    /// ```no_run
    /// # async fn run(client: fluent_rest::RestClient) {
    /// let result = client
    ///     .get()
    ///     .sub_resourcef("/users/%d/posts", &[&42])
    ///     .execute()
    ///     .await;
    /// # }
    /// ```
    pub fn sub_resourcef(mut self, template: &str, args: &[&dyn fmt::Display]) -> Self {
        self.sub_path = template.trim_start_matches('/').to_owned();
        self.sub_path_args = args.iter().map(|arg| arg.to_string()).collect();
        self
    }

    /// Serializes `value` as the JSON request body.
    ///
    /// `None` produces an empty body rather than `null`.
    pub fn body<B: Serialize + ?Sized>(mut self, value: Option<&B>) -> Self {
        let Some(value) = value else {
            self.body = Bytes::new();
            return self;
        };

        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "failed to serialize request body");

                self.body = Bytes::new();
                self.record(ConfigError::SerializeBody(Arc::new(err)).into());
            }
        }
        self
    }

    /// Sends the request, retrying GETs on connection resets and truncated
    /// bodies up to the configured bound.
    pub async fn execute(mut self) -> RestResult {
        if let Some(err) = self.err.take() {
            return RestResult::failed(err);
        }

        let mut attempts = 0usize;
        loop {
            attempts += 1;
            let cause = match self.guarded_attempt().await {
                Attempt::Success { status, body } => return RestResult::success(status, body),
                Attempt::Fatal(err) => return RestResult::failed(err),
                Attempt::Retry(cause) => cause,
            };

            if self.method != Method::GET {
                return RestResult::failed(RestError::Transport(cause));
            }
            if attempts > self.max_retries {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    method = %self.method,
                    attempts,
                    error = %cause,
                    "giving up after retryable failures"
                );

                return RestResult::failed(RestError::ExhaustedRetries {
                    attempts,
                    last: cause,
                });
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %self.method,
                attempt = attempts,
                max_retries = self.max_retries,
                error = %cause,
                "retrying request after {:?}",
                self.retry_interval
            );

            if let Err(err) = self.wait_before_retry().await {
                return RestResult::failed(err);
            }
        }
    }

    /// Runs one attempt under the configured timeout and cancellation token.
    async fn guarded_attempt(&self) -> Attempt {
        let bounded = async {
            match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.attempt())
                    .await
                    .unwrap_or(Attempt::Fatal(RestError::Timeout(timeout))),
                None => self.attempt().await,
            }
        };

        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Attempt::Fatal(RestError::Cancelled),
                attempt = bounded => attempt,
            },
            None => bounded.await,
        }
    }

    async fn attempt(&self) -> Attempt {
        let url = match self.url() {
            Ok(url) => url,
            Err(err) => return Attempt::Fatal(err.into()),
        };
        let headers = match attempt::wire_headers(self.headers.as_ref(), &self.credentials) {
            Ok(headers) => headers,
            Err(err) => return Attempt::Fatal(err.into()),
        };
        attempt::run(&self.transport, &self.method, url, headers, self.body.clone()).await
    }

    fn url(&self) -> Result<Url, ConfigError> {
        compose::compose_url(
            &self.base_url,
            &self.sub_path,
            &self.sub_path_args,
            &self.params,
            self.timeout,
        )
    }

    async fn wait_before_retry(&self) -> Result<(), RestError> {
        if self.retry_interval.is_zero() {
            return Ok(());
        }
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(RestError::Cancelled),
                _ = tokio::time::sleep(self.retry_interval) => Ok(()),
            },
            None => {
                tokio::time::sleep(self.retry_interval).await;
                Ok(())
            }
        }
    }

    fn record(&mut self, err: RestError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }
}
