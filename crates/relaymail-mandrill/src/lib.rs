//! # relaymail-mandrill
//!
//! Mandrill (Mailchimp Transactional) backend for `relaymail`.
//!
//! ## Features
//!
//! - **Full message support**: cc/bcc, Reply-To, extra headers, attachments
//!   and inline images
//! - **Tracking**: tags, metadata, open/click tracking
//! - **Templates**: stored templates with global and per-recipient merge data
//! - **Scheduling**: `send_at`
//! - **Escape hatch**: `esp_extra` is deep-merged into the request body
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_core::{BackendOptions, EmailMessage, Error};
//! use relaymail_mandrill::MandrillBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MandrillBackend::new("your-api-key")?.into_backend(BackendOptions::default());
//!
//!     let mut message = EmailMessage::new(
//!         "Subject", "Text content", "from@example.com", ["to@example.com"],
//!     );
//!     message.attach_alternative("<p>HTML content</p>", "text/html");
//!
//!     match message.send(&backend).await {
//!         Ok(sent) => println!("sent {sent}"),
//!         // The report says why each recipient was refused.
//!         Err(Error::RecipientsRefused { .. }) => println!("{:?}", message.status()),
//!         Err(err) => return Err(err.into()),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod backend;
pub mod payload;
pub mod response;

pub use backend::{DEFAULT_API_URL, MandrillBackend};
pub use payload::Payload;

/// Provider name used in errors and logs.
pub const ESP_NAME: &str = "Mandrill";
