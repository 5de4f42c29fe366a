//! Fan-out keyword search.
//!
//! The document snapshot is cut into contiguous slices, one per worker. Each
//! worker is a spawned task that owns a copy of its slice and reports its
//! matches on a private `oneshot` channel. Channels are read in worker order,
//! not completion order, so the merged list is always the concatenation of
//! the slices' results.

use super::engine::{LineCounter, search};
use super::types::{ParallelOutcome, SearchError};
use crate::storage::Document;
use crate::storage::partitioner::{effective_workers, partition};

use std::path::PathBuf;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

type WorkerResult = Result<Vec<u32>, SearchError>;

#[derive(Debug, Clone)]
pub struct ParallelSearch {
    counter: LineCounter,
    root: PathBuf,
}

impl ParallelSearch {
    pub fn new(counter: LineCounter, root: impl Into<PathBuf>) -> Self {
        Self {
            counter,
            root: root.into(),
        }
    }

    /// Searches `documents` with up to `requested` workers.
    ///
    /// Every worker is drained before returning. If any of them failed, the
    /// first failure in worker order is returned instead of a partial list.
    pub async fn run(
        &self,
        documents: &[Document],
        keyword: &str,
        requested: i64,
    ) -> Result<ParallelOutcome, SearchError> {
        let workers = effective_workers(requested, documents.len());
        let ranges = partition(documents.len(), workers);

        tracing::debug!(
            "Parallel search for '{}' over {} documents with {} workers",
            keyword,
            documents.len(),
            ranges.len()
        );

        let mut pending: Vec<(oneshot::Receiver<WorkerResult>, JoinHandle<()>)> =
            Vec::with_capacity(ranges.len());

        for (index, range) in ranges.into_iter().enumerate() {
            let slice = documents[range].to_vec();
            let counter = self.counter.clone();
            let root = self.root.clone();
            let keyword = keyword.to_string();
            let (tx, rx) = oneshot::channel();

            let handle = tokio::spawn(async move {
                let result = search(&counter, &root, &slice, &keyword).await;
                tracing::trace!("Search worker {} finished", index);
                let _ = tx.send(result);
            });

            pending.push((rx, handle));
        }

        let spawned = pending.len();
        let mut keys = Vec::new();
        let mut failure: Option<SearchError> = None;

        for (index, (rx, handle)) in pending.into_iter().enumerate() {
            let received = rx.await;
            let joined = handle.await;

            let error = match (received, joined) {
                (Ok(Ok(partial)), _) => {
                    keys.extend(partial);
                    continue;
                }
                (Ok(Err(e)), _) => SearchError::Worker {
                    index,
                    reason: e.to_string(),
                },
                (Err(_), Err(join)) if join.is_panic() => SearchError::Worker {
                    index,
                    reason: "worker panicked".to_string(),
                },
                (Err(_), _) => SearchError::Worker {
                    index,
                    reason: "result channel closed".to_string(),
                },
            };

            tracing::warn!("{}", error);
            if failure.is_none() {
                failure = Some(error);
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(ParallelOutcome {
                keys,
                workers: spawned,
            }),
        }
    }
}
