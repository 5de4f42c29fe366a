use crate::search::{LineCounter, SearchError};
use crate::storage::{Catalog, LfuCache, StorageError, persistence};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("channel {path}: {source}")]
    Channel {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unknown request type {0}")]
    UnknownKind(u32),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("document {0} not found")]
    NotFound(u32),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ServerError {
    pub fn channel(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Channel {
            path: path.into().display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Folder holding the documents and the index file.
    pub document_root: PathBuf,
    pub cache_capacity: usize,
    /// Shared inbound FIFO.
    pub server_pipe: PathBuf,
    /// Grep-compatible program used to count matching lines.
    pub line_counter: String,
}

/// Everything the broker owns between requests.
///
/// Only the broker touches this state. Delegated workers receive copies.
#[derive(Debug)]
pub struct ServerState {
    pub root: PathBuf,
    pub catalog: Catalog,
    pub cache: LfuCache,
    pub counter: LineCounter,
}

impl ServerState {
    pub fn new(root: impl Into<PathBuf>, catalog: Catalog, cache_capacity: usize) -> Self {
        let mut cache = LfuCache::new(cache_capacity);
        cache.warm(catalog.all());

        Self {
            root: root.into(),
            catalog,
            cache,
            counter: LineCounter::default(),
        }
    }

    /// Loads the catalog under `config.document_root`. Errors here are fatal for the server.
    pub fn load(config: &ServerConfig) -> Result<Self, ServerError> {
        let catalog = persistence::load(&config.document_root)?;
        let mut state = Self::new(&config.document_root, catalog, config.cache_capacity);
        state.counter = LineCounter::new(&config.line_counter);

        tracing::info!(
            "Cache warmed with {} of {} documents (capacity {})",
            state.cache.len(),
            state.catalog.len(),
            state.cache.capacity()
        );
        Ok(state)
    }

    /// Writes the catalog to disk. Failures are logged; the in-memory catalog stays authoritative.
    pub fn persist(&self) {
        match persistence::save(&self.root, &self.catalog) {
            Ok(()) => tracing::info!("Saved {} documents", self.catalog.len()),
            Err(e) => tracing::error!("Failed to save index in {}: {}", self.root.display(), e),
        }
    }
}
