use super::types::ServerError;
use std::future::Future;

/// Runs a read-only job in its own task and waits for it.
///
/// The task only gets owned data, so whatever goes wrong inside it (a panic,
/// a runaway helper process) cannot reach the broker's state. The caller
/// blocks until the job is done; requests are still served one at a time.
pub async fn delegate<F>(label: &'static str, job: F) -> Result<String, ServerError>
where
    F: Future<Output = Result<String, ServerError>> + Send + 'static,
{
    tracing::debug!("Delegating {} to a worker", label);

    match tokio::spawn(job).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            tracing::error!("Worker for {} panicked", label);
            Err(ServerError::Worker(format!("{} worker panicked", label)))
        }
        Err(e) => Err(ServerError::Worker(e.to_string())),
    }
}
