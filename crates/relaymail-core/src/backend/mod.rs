//! Delivery backends.
//!
//! [`EmailBackend`] is what callers send through. Providers implement the
//! smaller [`Esp`] trait (one request, one report) and get the shared send
//! loop, defaults, refusal checks and `fail_silently` handling from
//! [`ProviderBackend`].

mod memory;

pub use memory::MemoryBackend;

use std::borrow::Cow;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::message::EmailMessage;
use crate::status::{DeliveryStatus, Outcome};

/// A component that delivers messages.
#[async_trait]
pub trait EmailBackend: Send + Sync {
    /// Sends every message and returns how many were sent.
    ///
    /// Each message that reaches the provider gets a fresh
    /// [`DeliveryStatus`]; a report from an earlier attempt is replaced.
    ///
    /// # Errors
    ///
    /// - [`Error::Api`] if the provider rejects the request. The message's
    ///   report is left empty.
    /// - [`Error::RecipientsRefused`] if every recipient was refused. The
    ///   message's report is already attached.
    async fn send_messages(&self, messages: &mut [EmailMessage]) -> Result<usize>;

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// See [`EmailBackend::send_messages`].
    async fn send(&self, message: &mut EmailMessage) -> Result<usize> {
        self.send_messages(std::slice::from_mut(message)).await
    }
}

/// A transactional email provider.
#[async_trait]
pub trait Esp: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Performs one provider round trip for `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or the provider
    /// rejects it.
    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryStatus>;
}

/// Defaults merged into every message before delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendDefaults {
    /// Tags prepended to the message's tags.
    pub tags: Vec<String>,
    /// Metadata; message keys win.
    pub metadata: BTreeMap<String, Value>,
    /// Open tracking when the message does not say.
    pub track_opens: Option<bool>,
    /// Click tracking when the message does not say.
    pub track_clicks: Option<bool>,
}

impl SendDefaults {
    /// Returns true if no default is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns `message` with defaults applied, borrowing when there are none.
    #[must_use]
    pub fn apply<'a>(&self, message: &'a EmailMessage) -> Cow<'a, EmailMessage> {
        if self.is_empty() {
            return Cow::Borrowed(message);
        }

        let mut merged = message.clone();
        merged.tags = self.tags.iter().chain(&message.tags).cloned().collect();

        let mut metadata = self.metadata.clone();
        metadata.extend(message.metadata.clone());
        merged.metadata = metadata;

        merged.track_opens = message.track_opens.or(self.track_opens);
        merged.track_clicks = message.track_clicks.or(self.track_clicks);
        Cow::Owned(merged)
    }
}

/// Options shared by all provider backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    /// Count failed messages as unsent instead of returning the error.
    pub fail_silently: bool,
    /// Never return [`Error::RecipientsRefused`].
    pub ignore_recipient_status: bool,
    /// Defaults merged into each message.
    pub send_defaults: SendDefaults,
}

/// [`EmailBackend`] for any [`Esp`].
#[derive(Debug, Clone)]
pub struct ProviderBackend<E> {
    esp: E,
    options: BackendOptions,
}

impl<E: Esp> ProviderBackend<E> {
    /// Wraps a provider with default options.
    #[must_use]
    pub fn new(esp: E) -> Self {
        Self {
            esp,
            options: BackendOptions::default(),
        }
    }

    /// Sets the backend options.
    #[must_use]
    pub fn with_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub const fn esp(&self) -> &E {
        &self.esp
    }

    /// Returns the backend options.
    #[must_use]
    pub const fn options(&self) -> &BackendOptions {
        &self.options
    }

    /// Sends one message; `Ok(false)` if there was nobody to send to.
    ///
    /// Any report from an earlier attempt is replaced, even when the
    /// message is skipped.
    async fn send_one(&self, message: &mut EmailMessage) -> Result<bool> {
        message.set_status(DeliveryStatus::default());

        if message.recipients().is_empty() {
            debug!(esp = self.esp.name(), "Skipping message with no recipients");
            return Ok(false);
        }

        let status = {
            let outgoing = self.options.send_defaults.apply(message);
            self.esp.deliver(&outgoing).await?
        };

        let fully_rejected = status.outcome() == Some(Outcome::FullyRejected);
        let refused = status.refused_recipients();
        debug!(
            esp = self.esp.name(),
            statuses = ?status.status(),
            "Provider accepted request"
        );
        message.set_status(status);

        if fully_rejected && !self.options.ignore_recipient_status {
            warn!(esp = self.esp.name(), ?refused, "All recipients refused");
            return Err(Error::RecipientsRefused {
                recipients: refused,
            });
        }

        Ok(true)
    }
}

#[async_trait]
impl<E: Esp> EmailBackend for ProviderBackend<E> {
    async fn send_messages(&self, messages: &mut [EmailMessage]) -> Result<usize> {
        let mut sent = 0;

        for message in messages.iter_mut() {
            match self.send_one(message).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(err) if self.options.fail_silently => {
                    warn!(esp = self.esp.name(), error = %err, "Send failed silently");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(sent)
    }
}
