//! Error types for the core library.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while building or sending a message.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider rejected the request (transport, authentication or validation).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The provider accepted the request but refused every recipient.
    ///
    /// The delivery status report is already attached to the message.
    #[error("All message recipients were refused: {}", .recipients.join(", "))]
    RecipientsRefused {
        /// The refused recipient addresses.
        recipients: Vec<String>,
    },

    /// An address could not be parsed.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// The message uses a feature the backend cannot express.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Returns the HTTP status code if this is a provider API error.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status_code,
            _ => None,
        }
    }

    /// Returns true if the provider refused every recipient.
    #[must_use]
    pub const fn is_recipients_refused(&self) -> bool {
        matches!(self, Self::RecipientsRefused { .. })
    }
}

/// Rejection reported by a provider's API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Provider name (e.g., "Mandrill").
    pub esp_name: String,
    /// HTTP status code; `None` when no response was received.
    pub status_code: Option<u16>,
    /// Short description of what went wrong.
    pub description: String,
    /// Raw response body from the provider.
    pub response_text: Option<String>,
}

impl ApiError {
    /// Creates an error for a response the provider answered with a failure status.
    #[must_use]
    pub fn from_response(
        esp_name: impl Into<String>,
        status_code: u16,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            esp_name: esp_name.into(),
            status_code: Some(status_code),
            description: format!("API response {status_code}"),
            response_text: Some(response_text.into()),
        }
    }

    /// Creates an error for a request that never got a response.
    #[must_use]
    pub fn transport(esp_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            esp_name: esp_name.into(),
            status_code: None,
            description: description.into(),
            response_text: None,
        }
    }

    /// Attaches the response body.
    #[must_use]
    pub fn with_response_text(mut self, text: impl Into<String>) -> Self {
        self.response_text = Some(text.into());
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.esp_name, self.description)?;
        if let Some(text) = &self.response_text {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
