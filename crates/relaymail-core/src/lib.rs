//! # relaymail-core
//!
//! Provider-independent pieces of `relaymail`.
//!
//! This crate provides:
//! - The outgoing [`EmailMessage`] model
//! - [`DeliveryStatus`] reports attached to messages after a send attempt
//! - The [`EmailBackend`] contract and the [`Esp`] trait providers implement
//! - An in-memory [`MemoryBackend`] for exercising the send path offline
//!
//! ## Example
//!
//! ```ignore
//! use relaymail_core::{EmailMessage, MemoryBackend, ProviderBackend};
//!
//! let backend = ProviderBackend::new(MemoryBackend::new());
//! let mut message = EmailMessage::new(
//!     "Subject", "Text content", "from@example.com", ["to@example.com"],
//! );
//! message.attach_alternative("<p>HTML content</p>", "text/html");
//!
//! let sent = message.send(&backend).await?;
//! let status = message.status().expect("attached by send");
//! println!("{sent} sent, statuses {:?}", status.status());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
mod error;
pub mod message;
pub mod status;

pub use backend::{
    BackendOptions, EmailBackend, Esp, MemoryBackend, ProviderBackend, SendDefaults,
};
pub use error::{ApiError, Error, Result};
pub use message::{Address, Attachment, EmailMessage, parse_address_list};
pub use status::{DeliveryStatus, MessageId, Outcome, RecipientStatus, SendStatus};
