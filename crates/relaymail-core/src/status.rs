//! Delivery status reports.
//!
//! After a send attempt every [`EmailMessage`](crate::EmailMessage) carries a
//! [`DeliveryStatus`]: one [`RecipientStatus`] per recipient, plus the set of
//! distinct statuses and the provider message id(s).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-recipient send status.
///
/// Providers may report values outside the known vocabulary; those are kept
/// in [`SendStatus::Other`], trimmed and lowercased like every parsed value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SendStatus {
    /// Accepted for delivery.
    Sent,
    /// Provider deferred the accept/reject decision.
    Queued,
    /// Accepted for delivery at a later time.
    Scheduled,
    /// Refused, e.g. the address is on a rejection blacklist.
    Rejected,
    /// Refused because the address is malformed.
    Invalid,
    /// Send failed for another reason.
    Failed,
    /// Provider did not say.
    Unknown,
    /// Provider-defined status.
    Other(String),
}

impl SendStatus {
    /// Parses a provider status string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => Self::Sent,
            "queued" => Self::Queued,
            "scheduled" => Self::Scheduled,
            "rejected" => Self::Rejected,
            "invalid" => Self::Invalid,
            "failed" => Self::Failed,
            "unknown" | "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the status as provider text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sent => "sent",
            Self::Queued => "queued",
            Self::Scheduled => "scheduled",
            Self::Rejected => "rejected",
            Self::Invalid => "invalid",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
            Self::Other(s) => s,
        }
    }

    /// Returns true if the provider refused this recipient.
    #[must_use]
    pub const fn is_refused(&self) -> bool {
        matches!(self, Self::Rejected | Self::Invalid)
    }

    /// Returns true if the outcome is not yet decided.
    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Queued | Self::Scheduled)
    }
}

impl From<String> for SendStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<SendStatus> for String {
    fn from(status: SendStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientStatus {
    /// Send status.
    pub status: SendStatus,
    /// Provider message id, when accepted.
    pub message_id: Option<String>,
}

impl RecipientStatus {
    /// Creates a recipient status.
    #[must_use]
    pub const fn new(status: SendStatus, message_id: Option<String>) -> Self {
        Self { status, message_id }
    }
}

/// Provider message id(s) for a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// The id of the only recipient.
    Single(String),
    /// One id per recipient.
    Multiple(BTreeSet<String>),
}

impl MessageId {
    /// Returns the id if there is exactly one.
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(id) => Some(id),
            Self::Multiple(_) => None,
        }
    }
}

/// Terminal state of a send attempt that reached the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No recipient was refused.
    Sent,
    /// Some, but not all, recipients were refused.
    PartiallyRejected,
    /// Every recipient was refused.
    FullyRejected,
    /// The provider deferred its decision; neither success nor failure.
    Queued,
}

/// Structured result of a send attempt, attached to the message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryStatus {
    recipients: BTreeMap<String, RecipientStatus>,
    status: BTreeSet<SendStatus>,
    message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    esp_response: Option<Value>,
}

impl DeliveryStatus {
    /// Builds a report from per-recipient results.
    ///
    /// A recipient listed twice keeps its last result.
    pub fn from_recipients<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (String, RecipientStatus)>,
    {
        let recipients: BTreeMap<String, RecipientStatus> = results.into_iter().collect();
        let status = recipients.values().map(|r| r.status.clone()).collect();

        let message_id = if recipients.len() == 1 {
            recipients
                .values()
                .next()
                .and_then(|r| r.message_id.clone())
                .map(MessageId::Single)
        } else if recipients.is_empty() {
            None
        } else {
            Some(MessageId::Multiple(
                recipients
                    .values()
                    .filter_map(|r| r.message_id.clone())
                    .collect(),
            ))
        };

        Self {
            recipients,
            status,
            message_id,
            esp_response: None,
        }
    }

    /// Attaches the decoded provider response.
    #[must_use]
    pub fn with_esp_response(mut self, response: Value) -> Self {
        self.esp_response = Some(response);
        self
    }

    /// Per-recipient results, keyed by address.
    #[must_use]
    pub const fn recipients(&self) -> &BTreeMap<String, RecipientStatus> {
        &self.recipients
    }

    /// Result for one recipient.
    #[must_use]
    pub fn recipient(&self, email: &str) -> Option<&RecipientStatus> {
        self.recipients.get(email)
    }

    /// Distinct statuses across all recipients.
    #[must_use]
    pub const fn status(&self) -> &BTreeSet<SendStatus> {
        &self.status
    }

    /// Provider message id(s).
    #[must_use]
    pub const fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    /// Decoded provider response, if kept.
    #[must_use]
    pub const fn esp_response(&self) -> Option<&Value> {
        self.esp_response.as_ref()
    }

    /// Returns true if no recipient results were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Addresses the provider refused.
    #[must_use]
    pub fn refused_recipients(&self) -> Vec<String> {
        self.recipients
            .iter()
            .filter(|(_, r)| r.status.is_refused())
            .map(|(email, _)| email.clone())
            .collect()
    }

    /// Classifies the report; `None` for an empty report.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        if self.status.is_empty() {
            return None;
        }
        if self.status.iter().all(SendStatus::is_indeterminate) {
            return Some(Outcome::Queued);
        }
        let refused = self.status.iter().filter(|s| s.is_refused()).count();
        Some(if refused == self.status.len() {
            Outcome::FullyRejected
        } else if refused > 0 {
            Outcome::PartiallyRejected
        } else {
            Outcome::Sent
        })
    }
}
