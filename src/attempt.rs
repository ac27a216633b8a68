use std::{error::Error as StdError, fmt, io, sync::Arc};

use base64::Engine;
use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method, StatusCode,
};
use url::Url;

use crate::{
    error::{BoxError, ConfigError, SharedError},
    transport::{Transport, WireRequest},
    RestError,
};

/// What happened to a single attempt, before classification.
#[derive(Clone, Copy, Debug)]
pub enum AttemptOutcome<'a> {
    /// Response head and full body were received.
    Completed,
    /// The transport failed before a response arrived.
    DispatchFailed(&'a (dyn StdError + 'static)),
    /// A response arrived but reading its body failed.
    BodyReadFailed(&'a (dyn StdError + 'static)),
}

/// Retry classification of an attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Classification {
    Success,
    Fatal,
    Retryable,
}

/// Decides whether an attempt succeeded, failed for good, or may be repeated.
///
/// A dispatch failure is retryable only when the connection was reset and
/// the request is a GET. A body read cut short by an unexpected EOF is
/// retryable for any method; the retry loop still refuses to repeat
/// non-GET requests.
pub fn classify(outcome: &AttemptOutcome<'_>, method: &Method) -> Classification {
    match outcome {
        AttemptOutcome::Completed => Classification::Success,
        AttemptOutcome::DispatchFailed(err) => {
            let reset = has_io_error_kind(*err, io::ErrorKind::ConnectionReset);
            if *method == Method::GET && reset {
                Classification::Retryable
            } else {
                Classification::Fatal
            }
        }
        AttemptOutcome::BodyReadFailed(err) => {
            if has_io_error_kind(*err, io::ErrorKind::UnexpectedEof) {
                Classification::Retryable
            } else {
                Classification::Fatal
            }
        }
    }
}

fn has_io_error_kind(err: &(dyn StdError + 'static), kind: io::ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Result of one attempt as seen by the retry loop.
pub(crate) enum Attempt {
    Success { status: StatusCode, body: Bytes },
    Fatal(RestError),
    Retry(SharedError),
}

/// Username/password pair for HTTP Basic authentication.
#[derive(Clone, Default, Eq, PartialEq)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl Credentials {
    pub(crate) fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    fn authorization(&self) -> Result<HeaderValue, ConfigError> {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|err| ConfigError::InvalidCredentials(Arc::new(err)))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Headers sent on the wire: the configured set with JSON negotiation forced.
pub(crate) fn wire_headers(
    configured: Option<&HeaderMap>,
    credentials: &Credentials,
) -> Result<HeaderMap, ConfigError> {
    let mut headers = configured.cloned().unwrap_or_default();

    headers.remove(header::ACCEPT_ENCODING);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));

    if !credentials.is_empty() {
        headers.insert(header::AUTHORIZATION, credentials.authorization()?);
    }
    Ok(headers)
}

/// Dispatches one wire request and classifies what came back.
pub(crate) async fn run<T: Transport>(
    transport: &T,
    method: &Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
) -> Attempt {
    let request = WireRequest {
        method: method.clone(),
        url,
        headers,
        body,
    };

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => return failed(err, Stage::Dispatch, method),
    };

    let status = response.status();
    match response.bytes().await {
        Ok(body) => Attempt::Success { status, body },
        Err(err) => failed(err, Stage::ReadBody, method),
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Dispatch,
    ReadBody,
}

fn failed(err: BoxError, stage: Stage, method: &Method) -> Attempt {
    let outcome = match stage {
        Stage::Dispatch => AttemptOutcome::DispatchFailed(&*err),
        Stage::ReadBody => AttemptOutcome::BodyReadFailed(&*err),
    };
    let classification = classify(&outcome, method);
    let shared = SharedError::from(err);
    match classification {
        Classification::Retryable => Attempt::Retry(shared),
        _ => Attempt::Fatal(RestError::Transport(shared)),
    }
}
