//! In-memory backend that records messages instead of sending them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::Esp;
use crate::error::Result;
use crate::message::EmailMessage;
use crate::status::{DeliveryStatus, RecipientStatus, SendStatus};

/// Provider stand-in that keeps every delivered message in an outbox.
///
/// Each recipient is reported as `sent` with a generated message id. Clones
/// share the same outbox. Wrap it in
/// [`ProviderBackend`](super::ProviderBackend) to send through it.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message delivered so far.
    pub async fn outbox(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }

    /// Empties the outbox.
    pub async fn clear(&self) {
        self.outbox.lock().await.clear();
    }
}

#[async_trait]
impl Esp for MemoryBackend {
    fn name(&self) -> &str {
        "Memory"
    }

    async fn deliver(&self, message: &EmailMessage) -> Result<DeliveryStatus> {
        let status = DeliveryStatus::from_recipients(message.recipients().into_iter().map(|r| {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            (
                r.to_string(),
                RecipientStatus::new(SendStatus::Sent, Some(format!("memory-{id}"))),
            )
        }));

        let mut outbox = self.outbox.lock().await;
        outbox.push(message.clone());
        debug!(outbox_len = outbox.len(), "Recorded message");

        Ok(status)
    }
}
