// Application state module
// Shared, read-only collaborators for every request

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::Config;
use crate::error::{Result, WikiError};
use crate::handler::{Dispatcher, PageContext};
use crate::render::{Renderer, TemplateSet};
use crate::storage::{FileStore, PageStore, Title};

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PageStore>,
    pub renderer: Arc<dyn Renderer>,
    pub dispatcher: Dispatcher,
    /// Validated `wiki.front_page`
    pub front_page: Option<Title>,

    // Cached config values for fast access without locks
    pub cached_access_log: Arc<AtomicBool>,
}

impl AppState {
    /// Build state from configuration, loading templates once
    pub fn new(config: &Config) -> Result<Self> {
        let renderer = match &config.templates.dir {
            Some(dir) => TemplateSet::load_dir(dir)?,
            None => TemplateSet::builtin()?,
        };
        let store = FileStore::new(config.storage.data_dir.clone());
        Self::with_parts(config, Arc::new(store), Arc::new(renderer))
    }

    /// Build state around explicit store and renderer
    pub fn with_parts(
        config: &Config,
        store: Arc<dyn PageStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self> {
        let front_page = config
            .wiki
            .front_page
            .as_deref()
            .map(|raw| {
                Title::parse(raw)
                    .map_err(|_| WikiError::InvalidTitle(format!("wiki.front_page = {raw:?}")))
            })
            .transpose()?;

        Ok(Self {
            config: config.clone(),
            store,
            renderer,
            dispatcher: Dispatcher::new(config.wiki.grammar),
            front_page,
            cached_access_log: Arc::new(AtomicBool::new(config.logging.access_log)),
        })
    }

    /// Collaborators handed to page handlers
    pub fn page_context(&self) -> PageContext<'_> {
        PageContext {
            store: self.store.as_ref(),
            renderer: self.renderer.as_ref(),
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}
