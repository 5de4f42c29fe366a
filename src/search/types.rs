use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line counter exited with {status}: {stderr}")]
    Helper { status: String, stderr: String },

    #[error("unexpected line counter output: {0}")]
    Output(String),

    #[error("search worker {index} failed: {reason}")]
    Worker { index: usize, reason: String },
}

/// Result of a fan-out search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelOutcome {
    /// Matching keys, worker 0's slice first.
    pub keys: Vec<u32>,
    /// Number of workers that were actually spawned after clamping.
    pub workers: usize,
}
