//! Mandrill API responses.

use relaymail_core::{ApiError, DeliveryStatus, RecipientStatus, Result, SendStatus};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ESP_NAME;

/// One entry of a successful send response.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipientResponse {
    /// Recipient address.
    pub email: String,
    /// Send status (`sent`, `queued`, `scheduled`, `rejected`, `invalid`).
    pub status: String,
    /// Mandrill message id.
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// Why the recipient was rejected, if it was.
    #[serde(default)]
    pub reject_reason: Option<String>,
}

impl RecipientResponse {
    fn into_status(self) -> (String, RecipientStatus) {
        let message_id = self.id.filter(|id| !id.is_empty());
        (
            self.email,
            RecipientStatus::new(SendStatus::parse(&self.status), message_id),
        )
    }
}

/// Error body Mandrill sends with a non-200 status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: String,
    /// Numeric Mandrill error code.
    pub code: i64,
    /// Error class (e.g., `Invalid_Key`, `ValidationError`).
    pub name: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorResponse {
    /// Converts to an API error, keeping the raw body for display.
    #[must_use]
    pub fn into_error(self, status_code: u16, response_text: &str) -> ApiError {
        let mut err = ApiError::from_response(ESP_NAME, status_code, response_text);
        err.description = format!("API response {status_code} ({})", self.name);
        err
    }
}

/// Parses the HTTP response of a send call into a delivery report.
///
/// # Errors
///
/// Returns [`relaymail_core::Error::Api`] if the status is not 200 or the
/// body is not the expected JSON array.
pub fn parse_send_response(status_code: u16, body: &str) -> Result<DeliveryStatus> {
    if status_code != 200 {
        let err = serde_json::from_str::<ErrorResponse>(body).map_or_else(
            |_| ApiError::from_response(ESP_NAME, status_code, body),
            |error| error.into_error(status_code, body),
        );
        return Err(err.into());
    }

    let json: Value = serde_json::from_str(body).map_err(|_| {
        invalid_response(status_code, body, "Invalid JSON in Mandrill API response")
    })?;

    let recipients: Vec<RecipientResponse> = serde_json::from_value(json.clone())
        .map_err(|_| invalid_response(status_code, body, "Invalid Mandrill API response format"))?;
    if recipients.is_empty() {
        return Err(
            invalid_response(status_code, body, "Invalid Mandrill API response format").into(),
        );
    }

    for recipient in &recipients {
        if let Some(reason) = &recipient.reject_reason {
            debug!(email = %recipient.email, %reason, "Mandrill reject reason");
        }
    }

    Ok(
        DeliveryStatus::from_recipients(recipients.into_iter().map(RecipientResponse::into_status))
            .with_esp_response(json),
    )
}

fn invalid_response(status_code: u16, body: &str, description: &str) -> ApiError {
    ApiError {
        esp_name: ESP_NAME.to_string(),
        status_code: Some(status_code),
        description: description.to_string(),
        response_text: None,
    }
    .with_response_text(body)
}
