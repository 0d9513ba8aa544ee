//! Page and title types

use crate::error::{Result, WikiError};
use std::fmt;

/// Validated page title
///
/// Non-empty, ASCII alphanumeric only. The only constructor is `Title::parse`,
/// so a `Title` never contains separators, dots, or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(WikiError::InvalidTitle(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A page as seen by one request: title plus raw body bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    title: Title,
    body: Vec<u8>,
}

impl Page {
    pub fn new(title: Title, body: impl Into<Vec<u8>>) -> Self {
        Self {
            title,
            body: body.into(),
        }
    }

    /// Placeholder for a title with nothing stored yet
    pub const fn empty(title: Title) -> Self {
        Self {
            title,
            body: Vec::new(),
        }
    }

    pub const fn title(&self) -> &Title {
        &self.title
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body for display, decoded lossily as UTF-8
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
