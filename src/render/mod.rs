//! Page rendering module
//!
//! The renderer is built once at startup and shared read-only by every request.

mod template;

pub use template::TemplateSet;

use crate::error::Result;
use crate::storage::Page;

/// Templates a handler may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    View,
    Edit,
}

impl TemplateName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }

    /// File the template is read from inside the templates directory
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::View => "view.html",
            Self::Edit => "edit.html",
        }
    }
}

/// Turns a page into response markup
pub trait Renderer: Send + Sync {
    fn render(&self, name: TemplateName, page: &Page) -> Result<String>;
}
