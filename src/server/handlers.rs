//! Request Handlers
//!
//! Payload parsing and reply formatting for every request kind.
//!
//! Mutating handlers take the broker state by `&mut` and finish the whole
//! operation inline, persistence included. Read-only kinds are split in two:
//! a `prepare_*`/`resolve_*` step that copies what it needs out of the state
//! on the broker, and an owned job that runs inside a delegated worker.

use super::types::{ServerError, ServerState};
use crate::search::{LineCounter, ParallelSearch, format_keys, search};
use crate::storage::{Document, DocumentFields};

use std::path::PathBuf;

pub const SHUTDOWN_REPLY: &str = "Server is shutting down";

// --- Payload parsing ---

pub fn parse_key(raw: &str) -> Result<u32, ServerError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|key| *key > 0)
        .ok_or_else(|| ServerError::InvalidPayload(format!("'{}' is not a valid key", raw.trim())))
}

/// `title;authors;year;path`
pub fn parse_add(payload: &str) -> Result<DocumentFields, ServerError> {
    let parts: Vec<&str> = payload.split(';').collect();
    match parts.as_slice() {
        [title, authors, year, path] => Ok(DocumentFields::new(*title, *authors, *year, *path)),
        _ => Err(ServerError::InvalidPayload(format!(
            "expected title;authors;year;path, got {} fields",
            parts.len()
        ))),
    }
}

/// `key;keyword`
pub fn parse_count(payload: &str) -> Result<(u32, String), ServerError> {
    let (key, keyword) = payload
        .split_once(';')
        .ok_or_else(|| ServerError::InvalidPayload("expected key;keyword".to_string()))?;
    Ok((parse_key(key)?, keyword.to_string()))
}

/// `keyword;worker_count`
pub fn parse_parallel(payload: &str) -> Result<(String, i64), ServerError> {
    let (keyword, workers) = payload
        .rsplit_once(';')
        .ok_or_else(|| ServerError::InvalidPayload("expected keyword;worker_count".to_string()))?;
    let workers = workers.trim().parse::<i64>().map_err(|_| {
        ServerError::InvalidPayload(format!("'{}' is not a worker count", workers.trim()))
    })?;
    Ok((keyword.to_string(), workers))
}

// --- Mutating handlers ---

pub fn add(state: &mut ServerState, payload: &str) -> Result<String, ServerError> {
    let fields = parse_add(payload)?;
    let key = state.catalog.insert_checked(&state.root, fields)?;
    state.persist();
    Ok(format!("Document {} indexed", key))
}

pub fn delete(state: &mut ServerState, payload: &str) -> Result<String, ServerError> {
    let key = parse_key(payload)?;
    state.cache.invalidate(key);

    if state.catalog.delete(key).is_none() {
        return Err(ServerError::NotFound(key));
    }

    state.persist();
    tracing::debug!("Document {} removed, {} remaining", key, state.catalog.len());
    Ok(format!("Index entry {} deleted", key))
}

pub fn shutdown(state: &mut ServerState) -> String {
    state.persist();
    tracing::info!("Shutdown requested");
    SHUTDOWN_REPLY.to_string()
}

// --- Read-only handlers ---

/// Looks a document up through the cache, filling it on a catalog hit.
///
/// Runs on the broker so that usage counters survive the request.
pub fn resolve_consult(state: &mut ServerState, payload: &str) -> Result<Document, ServerError> {
    let key = parse_key(payload)?;

    if let Some(document) = state.cache.get(key) {
        tracing::debug!("Cache hit for document {}", key);
        return Ok(document.clone());
    }

    let document = state
        .catalog
        .lookup(key)
        .cloned()
        .ok_or(ServerError::NotFound(key))?;

    tracing::debug!("Cache miss for document {}", key);
    state.cache.put(document.clone());
    Ok(document)
}

pub fn render_document(document: &Document) -> String {
    format!(
        "Title: {}\nAuthors: {}\nYear: {}\nPath: {}",
        document.title, document.authors, document.year, document.path
    )
}

/// Owned inputs of a count-lines job.
#[derive(Debug, Clone)]
pub struct CountJob {
    pub counter: LineCounter,
    pub path: PathBuf,
    pub keyword: String,
}

impl CountJob {
    pub async fn run(self) -> Result<String, ServerError> {
        let count = self.counter.count(&self.path, &self.keyword).await?;
        Ok(count.to_string())
    }
}

pub fn prepare_count(state: &ServerState, payload: &str) -> Result<CountJob, ServerError> {
    let (key, keyword) = parse_count(payload)?;
    let document = state.catalog.lookup(key).ok_or(ServerError::NotFound(key))?;

    Ok(CountJob {
        counter: state.counter.clone(),
        path: document.resolve(&state.root),
        keyword,
    })
}

/// Owned inputs of a keyword search, serial or parallel.
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub counter: LineCounter,
    pub root: PathBuf,
    pub documents: Vec<Document>,
    pub keyword: String,
    /// `None` for a serial search.
    pub workers: Option<i64>,
}

impl SearchJob {
    pub async fn run(self) -> Result<String, ServerError> {
        let keys = match self.workers {
            None => search(&self.counter, &self.root, &self.documents, &self.keyword).await?,
            Some(requested) => {
                let engine = ParallelSearch::new(self.counter, self.root);
                let outcome = engine.run(&self.documents, &self.keyword, requested).await?;
                tracing::debug!(
                    "Parallel search used {} workers, {} matches",
                    outcome.workers,
                    outcome.keys.len()
                );
                outcome.keys
            }
        };
        Ok(format_keys(&keys))
    }
}

pub fn prepare_search(state: &ServerState, payload: &str) -> SearchJob {
    SearchJob {
        counter: state.counter.clone(),
        root: state.root.clone(),
        documents: state.catalog.all().to_vec(),
        keyword: payload.to_string(),
        workers: None,
    }
}

pub fn prepare_parallel_search(
    state: &ServerState,
    payload: &str,
) -> Result<SearchJob, ServerError> {
    let (keyword, workers) = parse_parallel(payload)?;
    Ok(SearchJob {
        workers: Some(workers),
        ..prepare_search(state, &keyword)
    })
}
