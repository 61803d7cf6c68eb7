//! # relaymail
//!
//! Send transactional email through a backend chosen by configuration.
//!
//! ```ignore
//! use relaymail::{EmailMessage, Settings, connect};
//!
//! let settings = Settings::load(&Settings::default_path()).await?.with_env()?;
//! let backend = connect(&settings)?;
//!
//! let mut message = EmailMessage::new(
//!     "Subject", "Text content", "from@example.com", ["to@example.com"],
//! );
//! let sent = message.send(backend.as_ref()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod settings;

pub use settings::{BackendKind, Settings, SettingsError, connect};

pub use relaymail_core::{
    ApiError, Attachment, BackendOptions, DeliveryStatus, EmailBackend, EmailMessage, Error,
    MessageId, Outcome, RecipientStatus, Result, SendDefaults, SendStatus,
};
pub use relaymail_mandrill::MandrillBackend;
