//! Flat-file page store
//!
//! One file per page, `{title}.txt`, directly inside the data directory.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{Page, PageStore, Title};
use crate::error::{Result, WikiError};
use crate::logger;

const PAGE_EXTENSION: &str = "txt";

/// Page store backed by plain files in one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PageStore for FileStore {
    fn key(&self, title: &Title) -> PathBuf {
        self.root.join(format!("{title}.{PAGE_EXTENSION}"))
    }

    fn load(&self, title: &Title) -> Result<Page> {
        let path = self.key(title);
        match fs::read(&path) {
            Ok(body) => {
                tracing::debug!(title = %title, bytes = body.len(), "page loaded");
                Ok(Page::new(title.clone(), body))
            }
            Err(e) => {
                // Unreadable and missing both read as "no page" to callers
                if e.kind() == io::ErrorKind::NotFound {
                    tracing::debug!(title = %title, "page not on disk");
                } else {
                    logger::log_warning(&format!(
                        "Failed to read page '{}': {e}",
                        path.display()
                    ));
                }
                Err(WikiError::NotFound(title.to_string()))
            }
        }
    }

    fn save(&self, page: &Page) -> Result<()> {
        let path = self.key(page.title());
        let mut file = open_for_overwrite(&path)?;
        file.write_all(page.body())?;
        file.flush()?;
        tracing::info!(title = %page.title(), bytes = page.body().len(), "page saved");
        Ok(())
    }
}

/// Create or truncate `path`, owner read/write only on creation
fn open_for_overwrite(path: &Path) -> io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}
