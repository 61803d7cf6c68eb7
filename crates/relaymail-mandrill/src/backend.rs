//! HTTP client for the Mandrill API.

use std::fmt;

use async_trait::async_trait;
use relaymail_core::{
    ApiError, BackendOptions, DeliveryStatus, EmailMessage, Error, Esp, ProviderBackend, Result,
};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::ESP_NAME;
use crate::payload::Payload;
use crate::response::parse_send_response;

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://mandrillapp.com/api/1.0/";

/// Mandrill provider.
///
/// On its own this performs a single API call per message; use
/// [`MandrillBackend::into_backend`] to get an
/// [`EmailBackend`](relaymail_core::EmailBackend).
#[derive(Clone)]
pub struct MandrillBackend {
    api_key: String,
    api_url: Url,
    http_client: Client,
}

impl MandrillBackend {
    /// Creates a backend for the production API.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("Mandrill API key is empty".into()));
        }

        Ok(Self {
            api_key,
            api_url: parse_api_url(DEFAULT_API_URL)?,
            http_client: Client::new(),
        })
    }

    /// Points the backend at another API root (e.g., a test server).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_api_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.api_url = parse_api_url(url.as_ref())?;
        Ok(self)
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Returns the API root.
    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Wraps this provider in a [`ProviderBackend`].
    #[must_use]
    pub fn into_backend(self, options: BackendOptions) -> ProviderBackend<Self> {
        ProviderBackend::new(self).with_options(options)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid Mandrill endpoint {path}: {e}")))
    }
}

/// Parses an API root, making sure relative joins stay under it.
fn parse_api_url(url: &str) -> Result<Url> {
    let mut url =
        Url::parse(url).map_err(|e| Error::Config(format!("Invalid Mandrill API URL: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn transport_error(err: &reqwest::Error) -> Error {
    ApiError::transport(ESP_NAME, format!("request failed: {err}")).into()
}

impl fmt::Debug for MandrillBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MandrillBackend")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Esp for MandrillBackend {
    fn name(&self) -> &str {
        ESP_NAME
    }

    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryStatus> {
        let payload = Payload::build(&self.api_key, message)?;
        let url = self.endpoint(payload.path)?;
        debug!(%url, recipients = message.recipients().len(), "Posting to Mandrill");

        let response = self
            .http_client
            .post(url)
            .json(&payload.body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status_code = response.status().as_u16();
        let text = response.text().await.map_err(|e| transport_error(&e))?;
        debug!(status_code, "Mandrill responded");

        parse_send_response(status_code, &text)
    }
}
