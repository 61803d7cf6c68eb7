//! Outgoing email messages.
//!
//! An [`EmailMessage`] is built by the caller, handed to a backend, and
//! comes back carrying the [`DeliveryStatus`] of its last send attempt.

mod address;
mod attachment;

pub use address::{Address, parse_address_list};
pub use attachment::Attachment;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::backend::EmailBackend;
use crate::error::Result;
use crate::status::DeliveryStatus;

/// An email message to send.
#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Alternative bodies as `(content, mimetype)` pairs.
    pub alternatives: Vec<(String, String)>,
    /// Sender address.
    pub from_email: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses.
    pub bcc: Vec<String>,
    /// Reply-To addresses.
    pub reply_to: Vec<String>,
    /// Extra headers.
    pub headers: BTreeMap<String, String>,
    /// Attachments, including inline images.
    pub attachments: Vec<Attachment>,

    /// Tags for provider-side reporting.
    pub tags: Vec<String>,
    /// Metadata echoed back by the provider in tracking events.
    pub metadata: BTreeMap<String, Value>,
    /// Override open tracking.
    pub track_opens: Option<bool>,
    /// Override click tracking.
    pub track_clicks: Option<bool>,
    /// Scheduled delivery time.
    pub send_at: Option<DateTime<Utc>>,
    /// Stored provider template to render instead of the body.
    pub template_id: Option<String>,
    /// Per-recipient merge variables, keyed by recipient address.
    pub merge_data: BTreeMap<String, Map<String, Value>>,
    /// Merge variables shared by all recipients.
    pub merge_global_data: Map<String, Value>,
    /// Provider-specific payload fields, merged into the request last.
    pub esp_extra: Map<String, Value>,

    status: Option<DeliveryStatus>,
}

impl EmailMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new<I, S>(
        subject: impl Into<String>,
        body: impl Into<String>,
        from_email: impl Into<String>,
        to: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: subject.into(),
            body: body.into(),
            from_email: from_email.into(),
            to: to.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds an alternative body (e.g., HTML).
    pub fn attach_alternative(&mut self, content: impl Into<String>, mimetype: impl Into<String>) {
        self.alternatives.push((content.into(), mimetype.into()));
    }

    /// Adds an attachment.
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Adds a Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to.push(address.into());
        self
    }

    /// Adds an extra header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets a metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Schedules delivery.
    #[must_use]
    pub const fn send_at(mut self, when: DateTime<Utc>) -> Self {
        self.send_at = Some(when);
        self
    }

    /// Renders a stored template instead of the message body.
    #[must_use]
    pub fn template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    /// Returns all recipients (to, cc, bcc).
    #[must_use]
    pub fn recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
            .collect()
    }

    /// Returns the status report of the last send attempt.
    ///
    /// `None` until the message has been handed to a backend.
    #[must_use]
    pub const fn status(&self) -> Option<&DeliveryStatus> {
        self.status.as_ref()
    }

    pub(crate) fn set_status(&mut self, status: DeliveryStatus) {
        self.status = Some(status);
    }

    /// Sends this message through `backend`.
    ///
    /// Returns the number of messages sent (0 or 1).
    ///
    /// # Errors
    ///
    /// See [`EmailBackend::send_messages`].
    pub async fn send<B: EmailBackend + ?Sized>(&mut self, backend: &B) -> Result<usize> {
        backend.send(self).await
    }
}
