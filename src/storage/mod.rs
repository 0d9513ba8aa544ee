//! Page persistence module
//!
//! Maps a page title to durable storage and back.
//! Every request resolves titles freshly; nothing is cached between requests.

mod file_store;
mod page;

pub use file_store::FileStore;
pub use page::{Page, Title};

use crate::error::Result;
use std::path::PathBuf;

/// Storage backend for pages
///
/// `key` is the single place where the title-to-location mapping lives.
pub trait PageStore: Send + Sync {
    /// Storage location for a title
    fn key(&self, title: &Title) -> PathBuf;

    /// Read a page in full; any read failure is `WikiError::NotFound`
    fn load(&self, title: &Title) -> Result<Page>;

    /// Create or truncate the page's storage with `page.body`
    fn save(&self, page: &Page) -> Result<()>;
}
