//! Email address types.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Email address with an optional display name.
///
/// Accepts both `user@example.com` and `Display Name <user@example.com>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Display name (optional).
    pub name: Option<String>,
    email: String,
}

impl Address {
    /// Parses an address, with or without a display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let (name, email) = match (input.rfind('<'), input.ends_with('>')) {
            (Some(open), true) => {
                let name = unquote(input[..open].trim());
                let email = input[open + 1..input.len() - 1].trim();
                ((!name.is_empty()).then(|| name.to_string()), email)
            }
            (None, false) => (None, input),
            _ => {
                return Err(Error::InvalidAddress(format!(
                    "Unbalanced angle brackets in {input:?}"
                )));
            }
        };

        Self::validate(email)?;
        Ok(Self {
            name,
            email: email.to_string(),
        })
    }

    /// Creates an address from a bare addr-spec and an optional name.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(email: impl Into<String>, name: Option<String>) -> Result<Self> {
        let email = email.into();
        Self::validate(&email)?;
        Ok(Self { name, email })
    }

    /// Returns the bare addr-spec.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Validates an addr-spec (basic validation).
    ///
    /// Deliverability is the provider's call; this only rejects strings
    /// that are not shaped like an address at all.
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        let parts: Vec<&str> = addr.split('@').collect();
        if parts.len() != 2 {
            return Err(Error::InvalidAddress(format!(
                "{addr:?} must have exactly one @"
            )));
        }

        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(Error::InvalidAddress(format!(
                "{addr:?}: local and domain parts cannot be empty"
            )));
        }

        if addr.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(Error::InvalidAddress(format!(
                "{addr:?} contains whitespace or a comma"
            )));
        }

        Ok(())
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if name.contains([',', '<', '>', '"', '@']) => {
                write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.email)
            }
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Parses every address in `addrs`, stopping at the first invalid one.
///
/// # Errors
///
/// Returns an error naming the first invalid address.
pub fn parse_address_list<S: AsRef<str>>(addrs: &[S]) -> Result<Vec<Address>> {
    addrs.iter().map(|a| Address::parse(a.as_ref())).collect()
}
