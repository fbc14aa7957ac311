//! reqwest client configured from the `[http]` section.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::config::HttpConfig;

/// Used when `[http].connect_timeout_secs` is not set.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Used when `[http].request_timeout_secs` is not set.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The one HTTP client behind [`ApiClient`](crate::api::ApiClient).
///
/// Every platform call, token exchanges and key fetches included, goes
/// through it, so user agent and timeouts are set once here.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Client with the poetri user agent and default timeouts.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .request_timeout(config.request_timeout())
            .build()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`HttpClient`]. Starts from `poetri/<version>` and the
/// default timeouts.
pub struct HttpClientBuilder {
    builder: ClientBuilder,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            builder: Client::builder()
                .user_agent(concat!("poetri/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT),
        }
    }
}

impl HttpClientBuilder {
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.builder = self.builder.user_agent(ua);
        self
    }

    /// Bound on establishing the connection to the platform.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.connect_timeout(timeout);
        self
    }

    /// Bound on a whole call, connection through response body.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    /// Build the client. An invalid user agent from the config file falls
    /// back to reqwest's defaults rather than aborting the command.
    pub fn build(self) -> HttpClient {
        let inner = self.builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid [http] settings, using default HTTP client");
            Client::default()
        });
        HttpClient { inner }
    }
}
