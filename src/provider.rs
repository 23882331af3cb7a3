//! Outbound client for the SMS code delivery provider.
//!
//! The provider speaks a minimal GET protocol: one fixed endpoint,
//! parameterized by a number's access token, answering with the latest code
//! as a plain-text body or an empty body when nothing has arrived yet. The
//! trait boundary exists so the engine can be exercised against a stub in
//! tests and so the HTTP client stays swappable.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;
use url::Url;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("delivery request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("delivery endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid delivery endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Fetch the current code for a number. `Ok(None)` means the provider is
    /// reachable but has no code for this token yet.
    async fn fetch_code(&self, access_token: &str) -> Result<Option<String>, ProviderError>;
}

/// Production provider client with a bounded request timeout.
pub struct HttpCodeProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCodeProvider {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl CodeProvider for HttpCodeProvider {
    #[instrument(skip_all, err)]
    async fn fetch_code(&self, access_token: &str) -> Result<Option<String>, ProviderError> {
        // The provider routes on a `gs=<token>` path segment, not a query string.
        let url = self.base_url.join(&format!("gs={access_token}"))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let body = response.text().await?;
        let code = body.trim();
        if code.is_empty() {
            Ok(None)
        } else {
            Ok(Some(code.to_string()))
        }
    }
}
