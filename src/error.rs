//! Error types for page handling
//!
//! One taxonomy shared by the validator, the store, and the renderer.
//! Each variant maps to exactly one client-facing outcome in `handler::pages`.

use thiserror::Error;

/// Result type alias using `WikiError`
pub type Result<T> = std::result::Result<T, WikiError>;

#[derive(Debug, Error)]
pub enum WikiError {
    /// Request path does not match the title grammar (404 to the client)
    #[error("Invalid page title: {0}")]
    InvalidTitle(String),

    /// No readable file backs this title
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Storage failure other than a missing page (500 to the client)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template parsing or rendering failed (500 to the client)
    #[error("Render error: {0}")]
    Render(String),
}

impl WikiError {
    /// HTTP status code this error surfaces as when nothing recovers it
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTitle(_) | Self::NotFound(_) => 404,
            Self::Io(_) | Self::Render(_) => 500,
        }
    }
}
