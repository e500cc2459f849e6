use crate::error::{AtpromptError, Result};
use reqwest::blocking::Client;
use std::time::Duration;

/// Default timeout for a single `@url` fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking HTTP client for `@url` targets
///
/// Must not be created or dropped on an async runtime thread; the server
/// builds one inside `spawn_blocking` per request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns `AtpromptError::HttpClient` if the TLS backend fails to initialise.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AtpromptError::HttpClient)?;

        Ok(Self { client })
    }

    /// GETs `url` and returns the decoded response body
    ///
    /// # Errors
    ///
    /// Returns `AtpromptError::Fetch` for transport failures, timeouts and
    /// non-success statuses.
    pub fn fetch(&self, url: &str) -> Result<String> {
        let fetch_error = |source: reqwest::Error| AtpromptError::Fetch {
            url: url.to_string(),
            source,
        };

        tracing::debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(fetch_error)?;

        let status = response.status();
        let body = response.text().map_err(fetch_error)?;
        tracing::debug!(url, %status, bytes = body.len(), "fetched");

        Ok(body)
    }
}
