use std::{fmt, future::Future, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::HeaderMap, Method, StatusCode};
use url::Url;

use crate::error::BoxError;

type BodyFuture = Pin<Box<dyn Future<Output = Result<Bytes, BoxError>> + Send>>;

/// Fully built request handed to a [`Transport`] for one attempt.
#[derive(Clone, Debug)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Response head returned by a [`Transport`], with the body read deferred.
///
/// Dispatch and body read fail independently, and the retry classification
/// treats the two differently.
pub struct WireResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyFuture,
}

impl WireResponse {
    /// Creates a response whose body is produced by `body` when read.
    pub fn new<F>(status: StatusCode, headers: HeaderMap, body: F) -> Self
    where
        F: Future<Output = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: Box::pin(body),
        }
    }

    /// Creates a response with an already buffered body.
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(status, HeaderMap::new(), async move { Ok::<_, BoxError>(body) })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Reads the full response body.
    pub async fn bytes(self) -> Result<Bytes, BoxError> {
        self.body.await
    }
}

impl fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Executes wire requests.
///
/// Connection pooling and keep-alive are the implementation's concern.
/// Errors should keep their `source()` chain intact: connection resets and
/// truncated bodies are recognised by the `std::io::Error` found in it.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, BoxError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, BoxError> {
        let WireRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let response = self
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        Ok(WireResponse::new(status, headers, async move {
            response.bytes().await.map_err(BoxError::from)
        }))
    }
}
