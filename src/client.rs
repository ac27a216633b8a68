use std::fmt;

use reqwest::Method;

use crate::{attempt::Credentials, transport::Transport, ClientOptions, Request};

/// Entry point for REST calls against one base URL.
///
/// Every verb method returns a fresh, independent [`Request`] seeded with
/// the base URL, credentials and [`ClientOptions`].
#[derive(Clone)]
pub struct RestClient<T = reqwest::Client> {
    transport: T,
    base_url: String,
    credentials: Credentials,
    options: ClientOptions,
}

impl<T> fmt::Debug for RestClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .finish()
    }
}

impl<T: Transport> RestClient<T> {
    /// Creates a client sending through `transport`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fluent_rest::RestClient;
    ///
    /// let api = RestClient::new(reqwest::Client::new(), "https://api.example.com");
    /// ```
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            credentials: Credentials::default(),
            options: ClientOptions::default(),
        }
    }

    /// Sends HTTP Basic credentials on every request. Empty credentials
    /// disable the `Authorization` header.
    pub fn set_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Applies default timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn get(&self) -> Request<T> {
        self.method(Method::GET)
    }

    pub fn post(&self) -> Request<T> {
        self.method(Method::POST)
    }

    pub fn put(&self) -> Request<T> {
        self.method(Method::PUT)
    }

    pub fn patch(&self) -> Request<T> {
        self.method(Method::PATCH)
    }

    pub fn delete(&self) -> Request<T> {
        self.method(Method::DELETE)
    }

    fn method(&self, method: Method) -> Request<T> {
        let request = Request::new(
            self.transport.clone(),
            method,
            self.base_url.clone(),
            self.credentials.clone(),
        )
        .with_max_retry(self.options.max_retries)
        .with_retry_interval(self.options.retry_interval());

        match self.options.timeout() {
            Some(timeout) => request.with_timeout(timeout),
            None => request,
        }
    }
}

impl RestClient<reqwest::Client> {
    /// Creates a `reqwest`-backed client from environment variables.
    ///
    /// Reads:
    /// - `REST_BASE_URL` — base URL of the API (required)
    /// - `REST_USERNAME` / `REST_PASSWORD` — Basic credentials (optional)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fluent_rest::RestClient;
    ///
    /// let api = RestClient::from_env().expect("missing REST_BASE_URL");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("REST_BASE_URL")
            .map_err(|_| "missing REST_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("REST_BASE_URL is set but empty".to_owned());
        }
        let username = std::env::var("REST_USERNAME").unwrap_or_default();
        let password = std::env::var("REST_PASSWORD").unwrap_or_default();

        Ok(Self::new(reqwest::Client::new(), base_url.trim()).set_basic_auth(username, password))
    }
}
