//! `fluent-rest` is a fluent async builder for JSON REST calls.
//!
//! A [`RestClient`] hands out one [`Request`] per verb:
//! - [`RestClient::get`], [`RestClient::post`], [`RestClient::put`],
//!   [`RestClient::patch`], [`RestClient::delete`]
//!
//! [`Request::execute`] composes the URL, forces JSON content negotiation,
//! applies Basic auth, and retries GETs on connection resets and truncated
//! bodies. The returned [`RestResult`] is decoded with
//! [`RestResult::decode`].

mod attempt;
mod client;
mod compose;
mod error;
mod options;
mod request;
mod result;
mod transport;

pub use attempt::{classify, AttemptOutcome, Classification};
pub use client::RestClient;
pub use error::{BoxError, ConfigError, RestError, SharedError};
pub use options::ClientOptions;
pub use request::Request;
pub use result::RestResult;
pub use transport::{Transport, WireRequest, WireResponse};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, RestError>;
