//! Settings and backend selection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use relaymail_core::{BackendOptions, EmailBackend, MemoryBackend, ProviderBackend};
use relaymail_mandrill::MandrillBackend;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Settings file is not valid JSON.
    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable has an unusable value.
    #[error("Invalid value {value:?} for {name}")]
    InvalidValue {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },
}

/// Which backend delivers mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Mandrill HTTP API.
    #[default]
    Mandrill,
    /// In-memory outbox; nothing leaves the process.
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mandrill" => Ok(Self::Mandrill),
            "memory" | "test" => Ok(Self::Memory),
            other => Err(format!("unknown email backend {other:?}")),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandrill => write!(f, "mandrill"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend selector.
    pub email_backend: BackendKind,
    /// Mandrill API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandrill_api_key: Option<String>,
    /// Mandrill API root override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandrill_api_url: Option<String>,
    /// Options shared by every backend.
    #[serde(flatten)]
    pub options: BackendOptions,
}

impl Settings {
    /// Default settings file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("relaymail")
            .join("settings.json")
    }

    /// Loads settings from a JSON file; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(?path, "No settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let settings = serde_json::from_str(&contents)?;
        info!(?path, "Loaded settings");
        Ok(settings)
    }

    /// Settings from the process environment alone.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable has an unusable value.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::default().with_env()
    }

    /// Overlays the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable has an unusable value.
    pub fn with_env(self) -> Result<Self, SettingsError> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Overlays variables from `lookup`:
    ///
    /// - `RELAYMAIL_EMAIL_BACKEND`
    /// - `MANDRILL_API_KEY`
    /// - `MANDRILL_API_URL`
    /// - `RELAYMAIL_FAIL_SILENTLY`
    /// - `RELAYMAIL_IGNORE_RECIPIENT_STATUS`
    ///
    /// # Errors
    ///
    /// Returns an error if a variable has an unusable value.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("RELAYMAIL_EMAIL_BACKEND") {
            self.email_backend = value.parse().map_err(|_| SettingsError::InvalidValue {
                name: "RELAYMAIL_EMAIL_BACKEND".into(),
                value,
            })?;
        }
        if let Some(key) = lookup("MANDRILL_API_KEY") {
            self.mandrill_api_key = Some(key);
        }
        if let Some(url) = lookup("MANDRILL_API_URL") {
            self.mandrill_api_url = Some(url);
        }
        if let Some(value) = lookup("RELAYMAIL_FAIL_SILENTLY") {
            self.options.fail_silently = parse_bool("RELAYMAIL_FAIL_SILENTLY", value)?;
        }
        if let Some(value) = lookup("RELAYMAIL_IGNORE_RECIPIENT_STATUS") {
            self.options.ignore_recipient_status =
                parse_bool("RELAYMAIL_IGNORE_RECIPIENT_STATUS", value)?;
        }
        Ok(self)
    }

    /// Selects the backend.
    #[must_use]
    pub const fn with_backend(mut self, kind: BackendKind) -> Self {
        self.email_backend = kind;
        self
    }

    /// Sets the Mandrill API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.mandrill_api_key = Some(key.into());
        self
    }

    /// Sets the Mandrill API root.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.mandrill_api_url = Some(url.into());
        self
    }

    /// Sets the shared backend options.
    #[must_use]
    pub fn with_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }
}

fn parse_bool(name: &str, value: String) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            name: name.to_string(),
            value,
        }),
    }
}

/// Builds the backend the settings select.
///
/// # Errors
///
/// Returns [`relaymail_core::Error::Config`] if the selected backend is
/// missing required settings.
pub fn connect(settings: &Settings) -> relaymail_core::Result<Box<dyn EmailBackend>> {
    debug!(backend = %settings.email_backend, "Connecting");

    match settings.email_backend {
        BackendKind::Mandrill => {
            let key = settings.mandrill_api_key.as_deref().ok_or_else(|| {
                relaymail_core::Error::Config("MANDRILL_API_KEY is not set".into())
            })?;

            let mut esp = MandrillBackend::new(key)?;
            if let Some(url) = &settings.mandrill_api_url {
                esp = esp.with_api_url(url)?;
            }
            Ok(Box::new(esp.into_backend(settings.options.clone())))
        }
        BackendKind::Memory => Ok(Box::new(
            ProviderBackend::new(MemoryBackend::new()).with_options(settings.options.clone()),
        )),
    }
}
